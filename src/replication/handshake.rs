//! Replica Handshake
//!
//! Sent once, at startup, before the listener is bound:
//!
//! ```text
//! replica                          master
//!    │ ── PING ───────────────────────> │
//!    │    (pause)                       │
//!    │ ── REPLCONF listening-port <p> ─>│
//!    │    (pause)                       │
//!    │ ── REPLCONF capa psync2 ────────>│
//!    │    (pause)                       │
//!    │ ── PSYNC ? -1 ──────────────────>│
//! ```
//!
//! Replies are never read. Steps are paced by a fixed pause rather than by
//! acknowledgements, so a slow master may still be processing an earlier
//! step when the next arrives.

use crate::config::ReplicaOf;
use crate::protocol::RespValue;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Pause between consecutive handshake commands.
pub const HANDSHAKE_PAUSE: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("failed to connect to master at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send {step} to master: {source}")]
    Write {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The four handshake requests, in order, each paired with a short label.
pub fn handshake_commands(listening_port: u16) -> [(&'static str, RespValue); 4] {
    [
        ("PING", RespValue::command(["PING"])),
        (
            "REPLCONF listening-port",
            RespValue::command([
                Bytes::from_static(b"REPLCONF"),
                Bytes::from_static(b"listening-port"),
                Bytes::from(listening_port.to_string()),
            ]),
        ),
        (
            "REPLCONF capa",
            RespValue::command(["REPLCONF", "capa", "psync2"]),
        ),
        ("PSYNC", RespValue::command(["PSYNC", "?", "-1"])),
    ]
}

/// Writes the handshake sequence to `stream`, pausing `pause` between steps.
pub async fn send_handshake<W>(
    stream: &mut W,
    listening_port: u16,
    pause: Duration,
) -> Result<(), HandshakeError>
where
    W: AsyncWrite + Unpin,
{
    for (i, (step, request)) in handshake_commands(listening_port).into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }

        let bytes = request.serialize();
        stream
            .write_all(&bytes)
            .await
            .map_err(|source| HandshakeError::Write { step, source })?;
        stream
            .flush()
            .await
            .map_err(|source| HandshakeError::Write { step, source })?;
        debug!(step, bytes = bytes.len(), "Sent handshake step");
    }

    Ok(())
}

/// Connects to `master` and sends the handshake.
///
/// The returned stream is still open. The caller owns it and keeps it alive.
pub async fn connect_to_master(
    master: &ReplicaOf,
    listening_port: u16,
    pause: Duration,
) -> Result<TcpStream, HandshakeError> {
    let addr = master.address();
    let mut stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| HandshakeError::Connect {
            addr: addr.clone(),
            source,
        })?;

    info!(master = %addr, "Connected to master, starting handshake");
    send_handshake(&mut stream, listening_port, pause).await?;
    info!(master = %addr, "Handshake sent");

    Ok(stream)
}
