//! Snapshot Loading
//!
//! An RDB file, if present, seeds the store once at startup. Records whose
//! expiry has already passed are dropped. The rest keep the time they have
//! left.

pub mod rdb;

use crate::storage::StorageEngine;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

pub use rdb::{decode, RdbDecoder};

/// A key/value record read from a snapshot.
///
/// Only string values exist today. Other value types are rejected by the
/// decoder, so supporting one means adding a variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotRecord {
    String {
        key: Bytes,
        value: Bytes,
        expires_at: Option<SystemTime>,
    },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not an RDB file (bad magic)")]
    BadMagic,

    #[error("snapshot ended unexpectedly")]
    Truncated,

    #[error("unsupported value type 0x{0:02X}")]
    UnsupportedValueType(u8),

    #[error("unsupported string encoding 0x{0:02X}")]
    UnsupportedEncoding(u8),
}

/// What a load did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records inserted into the store
    pub loaded: usize,
    /// Records skipped because their expiry had passed
    pub expired: usize,
}

/// Applies `records` to `storage` as of `now`.
pub fn load_records<I>(records: I, storage: &StorageEngine, now: SystemTime) -> LoadSummary
where
    I: IntoIterator<Item = SnapshotRecord>,
{
    let mut summary = LoadSummary::default();

    for record in records {
        match record {
            SnapshotRecord::String {
                key,
                value,
                expires_at: None,
            } => {
                storage.set(key, value);
                summary.loaded += 1;
            }
            SnapshotRecord::String {
                key,
                value,
                expires_at: Some(at),
            } => match at.duration_since(now) {
                Ok(remaining) if !remaining.is_zero() => {
                    storage.set_with_ttl(key, value, remaining);
                    summary.loaded += 1;
                }
                _ => {
                    debug!(key = %String::from_utf8_lossy(&key), "Skipping expired snapshot record");
                    summary.expired += 1;
                }
            },
        }
    }

    summary
}

/// Loads the snapshot at `path` into `storage`.
///
/// A missing file is not an error: the store simply starts empty.
pub fn load_file(
    path: impl AsRef<Path>,
    storage: &StorageEngine,
) -> Result<LoadSummary, SnapshotError> {
    let path = path.as_ref();

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot found, starting empty");
            return Ok(LoadSummary::default());
        }
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let records = decode(data)?;
    let summary = load_records(records, storage, SystemTime::now());
    info!(
        path = %path.display(),
        loaded = summary.loaded,
        expired = summary.expired,
        "Snapshot loaded"
    );

    Ok(summary)
}
