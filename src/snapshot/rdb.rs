//! RDB file decoder.
//!
//! ```text
//! "REDIS" <4-byte version>
//! { 0xFA aux-key aux-value
//! | 0xFE db-number
//! | 0xFB hash-size expire-size
//! | [0xFD <u32 LE secs> | 0xFC <u64 LE ms>] <value-type> key value }*
//! 0xFF [<8-byte checksum>]
//! ```
//!
//! Only string values are understood. The checksum is not verified.

use super::{SnapshotError, SnapshotRecord};
use bytes::{Buf, Bytes};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

const MAGIC: &[u8] = b"REDIS";
const VERSION_LEN: usize = 4;

mod opcode {
    pub const AUX: u8 = 0xFA;
    pub const RESIZE_DB: u8 = 0xFB;
    pub const EXPIRE_TIME_MS: u8 = 0xFC;
    pub const EXPIRE_TIME: u8 = 0xFD;
    pub const SELECT_DB: u8 = 0xFE;
    pub const EOF: u8 = 0xFF;
}

/// Value type byte for a plain string.
const TYPE_STRING: u8 = 0x00;

/// Special string encodings (low six bits after the `11` marker).
mod encoding {
    pub const INT8: u8 = 0;
    pub const INT16: u8 = 1;
    pub const INT32: u8 = 2;
}

/// A decoded length prefix.
enum Length {
    Plain(u64),
    /// `11xxxxxx`: the remaining six bits select a special string encoding.
    Special(u8),
}

/// Pull decoder over an in-memory RDB image.
#[derive(Debug)]
pub struct RdbDecoder {
    buf: Bytes,
    version: String,
    finished: bool,
}

impl RdbDecoder {
    /// Checks the header and positions the decoder at the first opcode.
    pub fn new(data: impl Into<Bytes>) -> Result<Self, SnapshotError> {
        let mut buf: Bytes = data.into();

        if buf.remaining() < MAGIC.len() + VERSION_LEN {
            return Err(if buf.starts_with(MAGIC) || MAGIC.starts_with(&buf) {
                SnapshotError::Truncated
            } else {
                SnapshotError::BadMagic
            });
        }
        if !buf.starts_with(MAGIC) {
            return Err(SnapshotError::BadMagic);
        }
        buf.advance(MAGIC.len());
        let version = String::from_utf8_lossy(&buf.split_to(VERSION_LEN)).into_owned();
        debug!(%version, "Reading RDB snapshot");

        Ok(Self {
            buf,
            version,
            finished: false,
        })
    }

    /// The four-character format version from the header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the next key/value record, or `None` at the end of the file.
    pub fn next_record(&mut self) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let mut expires_at = None;

        while !self.finished {
            // A file without the EOF opcode ends where the data ends.
            if !self.buf.has_remaining() {
                self.finished = true;
                break;
            }

            match self.buf.get_u8() {
                opcode::AUX => {
                    let key = self.read_string()?;
                    let value = self.read_string()?;
                    trace!(
                        key = %String::from_utf8_lossy(&key),
                        value = %String::from_utf8_lossy(&value),
                        "RDB aux field"
                    );
                }
                opcode::SELECT_DB => {
                    let db = self.read_length()?;
                    trace!(db, "RDB select db");
                }
                opcode::RESIZE_DB => {
                    let size = self.read_length()?;
                    let expires = self.read_length()?;
                    trace!(size, expires, "RDB resize db");
                }
                opcode::EXPIRE_TIME => {
                    self.need(4)?;
                    let secs = self.buf.get_u32_le();
                    expires_at = Some(UNIX_EPOCH + Duration::from_secs(u64::from(secs)));
                }
                opcode::EXPIRE_TIME_MS => {
                    self.need(8)?;
                    let ms = self.buf.get_u64_le();
                    expires_at = Some(UNIX_EPOCH + Duration::from_millis(ms));
                }
                opcode::EOF => {
                    // Optional trailing checksum, ignored.
                    self.finished = true;
                }
                TYPE_STRING => {
                    let key = self.read_string()?;
                    let value = self.read_string()?;
                    return Ok(Some(SnapshotRecord::String {
                        key,
                        value,
                        expires_at,
                    }));
                }
                other => return Err(SnapshotError::UnsupportedValueType(other)),
            }
        }

        Ok(None)
    }

    /// Decodes every remaining record.
    pub fn records(mut self) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn need(&self, n: usize) -> Result<(), SnapshotError> {
        if self.buf.remaining() < n {
            return Err(SnapshotError::Truncated);
        }
        Ok(())
    }

    fn read_length_encoding(&mut self) -> Result<Length, SnapshotError> {
        self.need(1)?;
        let first = self.buf.get_u8();

        match first >> 6 {
            0b00 => Ok(Length::Plain(u64::from(first & 0x3F))),
            0b01 => {
                self.need(1)?;
                let low = self.buf.get_u8();
                Ok(Length::Plain((u64::from(first & 0x3F) << 8) | u64::from(low)))
            }
            0b10 => match first {
                0x80 => {
                    self.need(4)?;
                    Ok(Length::Plain(u64::from(self.buf.get_u32())))
                }
                0x81 => {
                    self.need(8)?;
                    Ok(Length::Plain(self.buf.get_u64()))
                }
                other => Err(SnapshotError::UnsupportedEncoding(other)),
            },
            _ => Ok(Length::Special(first & 0x3F)),
        }
    }

    fn read_length(&mut self) -> Result<u64, SnapshotError> {
        match self.read_length_encoding()? {
            Length::Plain(len) => Ok(len),
            Length::Special(kind) => Err(SnapshotError::UnsupportedEncoding(0xC0 | kind)),
        }
    }

    fn read_string(&mut self) -> Result<Bytes, SnapshotError> {
        match self.read_length_encoding()? {
            Length::Plain(len) => {
                let len = usize::try_from(len).map_err(|_| SnapshotError::Truncated)?;
                self.need(len)?;
                Ok(self.buf.copy_to_bytes(len))
            }
            Length::Special(encoding::INT8) => {
                self.need(1)?;
                Ok(Bytes::from(self.buf.get_i8().to_string()))
            }
            Length::Special(encoding::INT16) => {
                self.need(2)?;
                Ok(Bytes::from(self.buf.get_i16_le().to_string()))
            }
            Length::Special(encoding::INT32) => {
                self.need(4)?;
                Ok(Bytes::from(self.buf.get_i32_le().to_string()))
            }
            Length::Special(kind) => Err(SnapshotError::UnsupportedEncoding(0xC0 | kind)),
        }
    }
}

/// Decodes a whole RDB image into records.
pub fn decode(data: impl Into<Bytes>) -> Result<Vec<SnapshotRecord>, SnapshotError> {
    RdbDecoder::new(data)?.records()
}

/// Milliseconds since the epoch as a `SystemTime`.
#[cfg(test)]
pub(crate) fn unix_ms(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Hand-assembled RDB images.

    pub fn header() -> Vec<u8> {
        b"REDIS0011".to_vec()
    }

    /// A short (6-bit length) string.
    pub fn string(s: &str) -> Vec<u8> {
        assert!(s.len() < 64);
        let mut out = vec![s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }

    pub fn record(key: &str, value: &str) -> Vec<u8> {
        let mut out = vec![0x00];
        out.extend(string(key));
        out.extend(string(value));
        out
    }

    pub fn record_expiring_ms(ms: u64, key: &str, value: &str) -> Vec<u8> {
        let mut out = vec![0xFC];
        out.extend_from_slice(&ms.to_le_bytes());
        out.extend(record(key, value));
        out
    }

    /// Header, aux and db preamble, the given body, then EOF and a checksum.
    pub fn file(body: &[u8]) -> Vec<u8> {
        let mut out = header();
        out.push(0xFA);
        out.extend(string("redis-ver"));
        out.extend(string("7.2.0"));
        out.extend_from_slice(&[0xFE, 0x00, 0xFB, 0x03, 0x01]);
        out.extend_from_slice(body);
        out.push(0xFF);
        out.extend_from_slice(&[0u8; 8]);
        out
    }
}
