//! A single framed TCP connection.
//!
//! The read half of the socket is owned by whichever task runs the receive
//! loop (server session or client receive task). [`Connection`] keeps the
//! write half and the close signal, and is shared behind an `Arc` between
//! the pool, the session, the watchdog and any writers.
//!
//! # Closing
//!
//! [`Connection::close`] is synchronous and idempotent: it cancels the
//! connection's token, which unblocks every task selecting on
//! [`Connection::closed`]. The task owning the read half then runs teardown,
//! guarded by [`Connection::begin_teardown`] so it happens exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{FrameReader, FrameWriter};

// ============================================================================
// Constants
// ============================================================================

/// How long [`Connection::shutdown`] waits for a closed connection's writer.
pub const WRITER_RELEASE_TIMEOUT: Duration = Duration::from_millis(250);

// ============================================================================
// Connection
// ============================================================================

/// Write side and lifecycle state of one socket.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. Concurrent [`send`](Self::send) calls are
/// serialized so frames never interleave on the wire.
pub struct Connection {
    /// Remote address.
    peer_addr: SocketAddr,
    /// Local address.
    local_addr: SocketAddr,
    /// Framed write half; `None` once shut down.
    writer: Mutex<Option<FrameWriter<OwnedWriteHalf>>>,
    /// Close signal.
    cancel: CancellationToken,
    /// Set by the first teardown.
    torn_down: AtomicBool,
}

impl Connection {
    /// Splits a stream into a shared connection and its frame reader.
    ///
    /// The connection is closed when `cancel` (or any of its parents) is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the socket addresses cannot be read, which
    /// happens when the peer already hung up.
    pub fn from_stream(
        stream: TcpStream,
        cancel: CancellationToken,
    ) -> Result<(Self, FrameReader<OwnedReadHalf>)> {
        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        let (read_half, write_half) = stream.into_split();

        let connection = Self {
            peer_addr,
            local_addr,
            writer: Mutex::new(Some(FrameWriter::new(write_half))),
            cancel,
            torn_down: AtomicBool::new(false),
        };

        Ok((connection, FrameReader::new(read_half)))
    }

    /// Returns the remote address.
    #[inline]
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the local address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends one frame.
    ///
    /// A send still waiting for the writer, or blocked on a peer that stopped
    /// reading, is abandoned as soon as the connection is closed. The frame
    /// may then be partially written.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection was closed locally
    /// - [`Error::Io`] if the write fails
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        let write = async {
            let mut writer = self.writer.lock().await;
            let writer = writer.as_mut().ok_or(Error::ConnectionClosed)?;
            writer.send(payload).await
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::ConnectionClosed),
            result = write => result,
        }
    }

    /// Signals every task using this connection to stop.
    ///
    /// Idempotent.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            trace!(peer = %self.peer_addr, "Closing connection");
            self.cancel.cancel();
        }
    }

    /// Returns `true` once [`close`](Self::close) was called or a parent
    /// token was cancelled.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Claims the right to tear this connection down.
    ///
    /// Returns `true` for exactly one caller.
    #[must_use]
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }

    /// Closes the connection and shuts down the write half of the socket.
    ///
    /// Closing makes every in-flight [`send`](Self::send) give up the writer.
    /// If the writer is still held after [`WRITER_RELEASE_TIMEOUT`] (a send
    /// future that is no longer polled), the socket is left to close when
    /// the last handle to this connection is dropped.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn shutdown(&self) {
        self.close();

        let writer = match timeout(WRITER_RELEASE_TIMEOUT, self.writer.lock()).await {
            Ok(mut writer) => writer.take(),
            Err(_) => {
                debug!(peer = %self.peer_addr, "Writer still busy, skipping socket shutdown");
                return;
            }
        };
        if let Some(mut writer) = writer
            && let Err(e) = writer.shutdown().await
        {
            debug!(peer = %self.peer_addr, error = %e, "Socket shutdown failed");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
