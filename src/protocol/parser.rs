//! Incremental RESP Frame Decoder
//!
//! Clients send every request as an array of bulk strings:
//!
//! ```text
//! *<n>\r\n
//! $<len>\r\n<len bytes>\r\n      (repeated n times)
//! ```
//!
//! The decoder works on whatever bytes have arrived so far and returns one
//! of three outcomes:
//! - `Ok(Some((frame, consumed)))`: a whole frame was decoded from the first `consumed` bytes
//! - `Ok(None)`: the frame is not complete yet, so read more and retry
//! - `Err(ParseError)`: the bytes can never become a valid frame
//!
//! Telling "incomplete" apart from "invalid" is what lets the connection loop
//! separate an orderly disconnect from one that cuts a frame in half.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// One decoded client request: the command name followed by its arguments.
pub type Frame = Vec<Bytes>;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The frame did not start with `*`
    #[error("expected array prefix '*', got {0:#04x}")]
    ExpectedArray(u8),

    /// An element did not start with `$`
    #[error("expected bulk string prefix '$', got {0:#04x}")]
    ExpectedBulkString(u8),

    /// A count or length line was not a non-negative decimal integer
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    /// A bulk string's payload was not followed by CRLF
    #[error("bulk string of {0} bytes missing trailing CRLF")]
    MissingTerminator(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Decoder for client request frames.
///
/// Stateless between calls; a partially received frame is simply re-scanned
/// once more bytes are available.
///
/// # Example
///
/// ```
/// use flintkv::protocol::RespParser;
///
/// let parser = RespParser::new();
/// let (frame, consumed) = parser
///     .parse_frame(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n")
///     .unwrap()
///     .unwrap();
/// assert_eq!(consumed, 23);
/// assert_eq!(frame[1], "hey");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RespParser;

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one frame from the front of `buf`.
    pub fn parse_frame(&self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }
        if buf[0] != prefix::ARRAY {
            return Err(ParseError::ExpectedArray(buf[0]));
        }

        let (count, mut consumed) = match read_length_line(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let mut frame = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            match parse_bulk(&buf[consumed..])? {
                Some((element, used)) => {
                    frame.push(element);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((frame, consumed)))
    }
}

/// Decodes `$<len>\r\n<data>\r\n` from the front of `buf`.
fn parse_bulk(buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf[0] != prefix::BULK_STRING {
        return Err(ParseError::ExpectedBulkString(buf[0]));
    }

    let (length, data_start) = match read_length_line(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    // The length comes from the client, so the end offset may overflow.
    let data_end = data_start
        .checked_add(length)
        .filter(|end| end.checked_add(CRLF.len()).is_some())
        .ok_or_else(|| ParseError::InvalidLength(length.to_string()))?;
    let total = data_end + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[data_end..total] != CRLF {
        return Err(ParseError::MissingTerminator(length));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_end]);
    Ok(Some((data, total)))
}

/// Reads the `<prefix><digits>\r\n` line at the front of `buf`.
///
/// Returns the parsed number and the number of bytes the line occupies.
fn read_length_line(buf: &[u8]) -> ParseResult<Option<(usize, usize)>> {
    let end = match find_crlf(&buf[1..]) {
        Some(pos) => 1 + pos,
        None => return Ok(None),
    };
    let length = parse_length(&buf[1..end])?;
    Ok(Some((length, end + 2)))
}

fn parse_length(digits: &[u8]) -> ParseResult<usize> {
    let invalid = || ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned());

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}

/// Returns the index of the first `\r\n` in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single frame with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    RespParser::new().parse_frame(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::RespValue;

    #[test]
    fn test_parse_ping() {
        let (frame, consumed) = parse_message(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
        assert_eq!(frame, vec![Bytes::from("PING")]);
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_parse_set_with_px() {
        let input = b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$3\r\n100\r\n";
        let (frame, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(frame.len(), 5);
        assert_eq!(frame[4], "100");
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_zero_length_element() {
        let (frame, consumed) = parse_message(b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(frame, vec![Bytes::from("ECHO"), Bytes::new()]);
        assert_eq!(consumed, 20);
    }

    #[test]
    fn test_empty_frame() {
        let (frame, consumed) = parse_message(b"*0\r\n").unwrap().unwrap();
        assert!(frame.is_empty());
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_length_is_byte_exact() {
        // The payload contains CRLF; only the declared length decides the boundary.
        let (frame, _) = parse_message(b"*1\r\n$4\r\na\r\nb\r\n").unwrap().unwrap();
        assert_eq!(frame[0], &b"a\r\nb"[..]);
    }

    #[test]
    fn test_binary_safe() {
        let (frame, _) = parse_message(b"*1\r\n$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(frame[0], &b"hel\x00o"[..]);
    }

    #[test]
    fn test_incomplete_frames() {
        let full = b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n";
        for cut in 1..full.len() {
            assert_eq!(
                parse_message(&full[..cut]).unwrap(),
                None,
                "prefix of {} bytes should be incomplete",
                cut
            );
        }
    }

    #[test]
    fn test_pipelined_frames_consume_one_at_a_time() {
        let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let (_, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(consumed, 14);
        let (frame, consumed2) = parse_message(&input[consumed..]).unwrap().unwrap();
        assert_eq!(frame[0], "PING");
        assert_eq!(consumed + consumed2, input.len());
    }

    #[test]
    fn test_rejects_non_array() {
        assert_eq!(
            parse_message(b"PING\r\n"),
            Err(ParseError::ExpectedArray(b'P'))
        );
        assert_eq!(
            parse_message(b"+OK\r\n"),
            Err(ParseError::ExpectedArray(b'+'))
        );
    }

    #[test]
    fn test_rejects_non_bulk_element() {
        assert_eq!(
            parse_message(b"*1\r\n:1\r\n"),
            Err(ParseError::ExpectedBulkString(b':'))
        );
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            parse_message(b"*-1\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"*x\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"*1\r\n$-1\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"*\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_rejects_missing_terminator() {
        assert_eq!(
            parse_message(b"*1\r\n$3\r\nheyXY"),
            Err(ParseError::MissingTerminator(3))
        );
    }

    #[test]
    fn test_rejects_oversized_length() {
        for length in [usize::MAX, usize::MAX - 1, usize::MAX - 20] {
            let frame = format!("*1\r\n${}\r\n", length);
            assert!(matches!(
                parse_message(frame.as_bytes()),
                Err(ParseError::InvalidLength(_))
            ));
        }

        // Too many digits for usize at all.
        assert!(matches!(
            parse_message(b"*1\r\n$99999999999999999999999\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_large_but_representable_length_waits() {
        let frame = format!("*1\r\n${}\r\nabc", usize::MAX / 2);
        assert_eq!(parse_message(frame.as_bytes()), Ok(None));
    }

    #[test]
    fn test_request_roundtrip() {
        let parts = ["SET", "key", "", "PX", "100"];
        let encoded = RespValue::command(parts).serialize();
        let (frame, consumed) = parse_message(&encoded).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        let decoded: Vec<&[u8]> = frame.iter().map(|b| b.as_ref()).collect();
        let expected: Vec<&[u8]> = parts.iter().map(|s| s.as_bytes()).collect();
        assert_eq!(decoded, expected);
    }
}
