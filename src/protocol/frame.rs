//! Delimiter framing over async byte streams.
//!
//! [`FrameWriter`] appends the [`DELIMITER`] to each payload and writes the
//! whole frame in one call. [`FrameReader`] buffers the stream and yields one
//! payload per delimiter with the delimiter stripped.
//!
//! # Example
//!
//! ```ignore
//! let (read_half, write_half) = stream.into_split();
//! let mut reader = FrameReader::new(read_half);
//! let mut writer = FrameWriter::new(write_half);
//!
//! writer.send(b"ping").await?;
//! let payload = reader.receive().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{trace, warn};

use crate::error::{Error, Result};

use super::DELIMITER;

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a payload as a frame (payload followed by the delimiter).
#[must_use]
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.extend_from_slice(payload);
    frame.push(DELIMITER);
    frame
}

// ============================================================================
// FrameReader
// ============================================================================

/// Reads delimiter-terminated frames from a byte stream.
///
/// [`receive`](Self::receive) is not cancel-safe: if its future is dropped
/// midway, bytes of a partially read frame are lost. Callers only cancel it
/// when they are about to discard the stream anyway.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a readable stream.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Waits for the next frame and returns its payload.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamClosed`] if the peer shut the stream down. Bytes of an
    ///   unterminated trailing frame are discarded.
    /// - [`Error::Io`] on any other read failure.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        let mut frame = Vec::new();
        let read = self.reader.read_until(DELIMITER, &mut frame).await?;

        if frame.pop() == Some(DELIMITER) {
            trace!(len = frame.len(), "Frame received");
            return Ok(frame);
        }

        if read > 0 {
            trace!(discarded = read, "Unterminated frame at end of stream");
        }
        Err(Error::StreamClosed)
    }

    /// Returns the underlying stream, dropping any buffered bytes.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

// ============================================================================
// FrameWriter
// ============================================================================

/// Writes delimiter-terminated frames to a byte stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a writable stream.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { writer: inner }
    }

    /// Writes `payload` followed by the delimiter and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream is closed or the write fails.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.contains(&DELIMITER) {
            warn!(
                len = payload.len(),
                "Payload contains the frame delimiter and will be split by the receiver"
            );
        }

        self.writer.write_all(&encode(payload)).await?;
        self.writer.flush().await?;

        trace!(len = payload.len(), "Frame sent");
        Ok(())
    }

    /// Shuts down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
