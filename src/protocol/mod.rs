//! RESP Protocol Implementation
//!
//! The server speaks the request side of RESP (arrays of bulk strings) and
//! encodes replies as simple strings, errors, bulk strings, the null bulk
//! string, arrays, or verbatim bytes.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` reply enum and its encoding
//! - `parser`: incremental decoder for inbound request frames
//!
//! ## Example
//!
//! ```
//! use flintkv::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! let (frame, _consumed) = parse_message(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n")
//!     .unwrap()
//!     .unwrap();
//! let reply = RespValue::bulk_string(frame[1].clone());
//! assert_eq!(reply.serialize(), b"$3\r\nhey\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, Frame, ParseError, ParseResult, RespParser};
pub use types::RespValue;
