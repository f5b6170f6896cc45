// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing for `simd` IPC.
//!
//! Each frame is a big-endian `u32` byte count followed by that many
//! bytes of JSON. Frames above [`MAX_MESSAGE_SIZE`] are refused in both
//! directions so a bad prefix cannot make the reader allocate gigabytes.

use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Request, Response};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("timed out waiting for the daemon")]
    Timeout,
}

/// Largest frame either side will send or accept. Kubeconfigs and
/// kubectl output are the big payloads; 16 MiB leaves ample room.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Per-frame timeout used by the daemon side of a connection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Daemon and CLI must agree on this; a mismatch triggers a daemon restart.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

fn ensure_fits(size: usize) -> Result<(), ProtocolError> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Run `fut`, mapping an elapsed deadline to [`ProtocolError::Timeout`].
pub async fn within<T, F>(timeout: Duration, fut: F) -> Result<T, ProtocolError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(ProtocolError::Timeout))
}

/// Serialize a message body. The length prefix is added by [`write_message`].
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(msg)?;
    ensure_fits(body.len())?;
    Ok(body)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one frame body. EOF before the prefix is a clean close.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let size = match reader.read_u32().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };
    ensure_fits(size)?;

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write one frame and flush it.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    body: &[u8],
) -> Result<(), ProtocolError> {
    ensure_fits(body.len())?;
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let body = within(timeout, read_message(reader)).await?;
    decode(&body)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let body = encode(response)?;
    within(timeout, write_message(writer, &body)).await
}
