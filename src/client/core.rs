//! Client connection and its background loops.
//!
//! A connected client runs two tasks sharing one [`Connection`]:
//!
//! - **receive loop**: delivers every frame from the server to the message
//!   callback
//! - **heartbeat loop**: sends the heartbeat frame every heartbeat interval,
//!   closing the connection if a send fails
//!
//! Both end when the connection is closed by [`Client::disconnect`], by
//! dropping the client, or by cancelling the external token.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::handler::{self, ClientMessageHandler, ErrorSink};
use crate::protocol::{FrameReader, HEARTBEAT};
use crate::transport::Connection;

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// ClientInner
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Client options.
    options: ClientOptions,

    /// Message callback.
    on_message: ClientMessageHandler,

    /// Destination of asynchronous errors.
    error_sink: Option<ErrorSink>,

    /// Cancelled when the client is dropped or the external token fires.
    root: CancellationToken,

    /// Current connection, if any.
    connection: Mutex<Option<Arc<Connection>>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for a pulsewire server.
///
/// # Example
///
/// ```no_run
/// use pulsewire::Client;
///
/// # async fn example() -> pulsewire::Result<()> {
/// let client = Client::builder()
///     .on_message(|msg| println!("server: {}", String::from_utf8_lossy(&msg)))
///     .build()?;
///
/// client.connect("127.0.0.1", 8080).await?;
/// client.write(b"hello from client").await?;
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("connected", &self.is_connected())
            .field("peer_addr", &self.peer_addr())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructor
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a disconnected client. Called by [`ClientBuilder::build`].
    pub(crate) fn new(
        options: ClientOptions,
        on_message: ClientMessageHandler,
        error_sink: Option<ErrorSink>,
        root: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                on_message,
                error_sink,
                root,
                connection: Mutex::new(None),
            }),
        }
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Dials the server and starts the receive and heartbeat loops.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if already connected or cancelled
    /// - [`Error::ConnectionTimeout`] if the connect timeout elapses
    /// - [`Error::Connect`] if the server cannot be reached
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        if self.is_connected() {
            return Err(Error::invalid_state("client already connected"));
        }
        if self.inner.root.is_cancelled() {
            return Err(Error::invalid_state("client cancelled"));
        }

        let addr = format!("{host}:{port}");
        let connect_timeout = self.inner.options.connect_timeout();

        let stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::connect(addr, e)),
            Err(_) => {
                return Err(Error::connection_timeout(
                    self.inner.options.connect_timeout_ms,
                ));
            }
        };

        let (connection, reader) =
            Connection::from_stream(stream, self.inner.root.child_token())
                .map_err(|e| match e {
                    Error::Io(source) => Error::connect(&addr, source),
                    other => other,
                })?;
        let connection = Arc::new(connection);

        {
            let mut slot = self.inner.connection.lock();
            if slot.as_ref().is_some_and(|current| !current.is_closed()) {
                connection.close();
                return Err(Error::invalid_state("client already connected"));
            }
            *slot = Some(Arc::clone(&connection));
        }

        info!(
            peer = %connection.peer_addr(),
            local = %connection.local_addr(),
            "Connected to server"
        );

        tokio::spawn(receive_loop(
            Arc::clone(&self.inner),
            Arc::clone(&connection),
            reader,
        ));
        tokio::spawn(heartbeat_loop(Arc::clone(&self.inner), connection));

        Ok(())
    }

    /// Sends a payload to the server.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if [`connect`](Self::connect) has not
    ///   succeeded or the client was disconnected
    /// - [`Error::ConnectionClosed`] if the connection has been closed
    /// - [`Error::Io`] if the write fails
    pub async fn write(&self, payload: &[u8]) -> Result<()> {
        let connection = self
            .inner
            .connection
            .lock()
            .clone()
            .ok_or(Error::NotConnected)?;

        connection.send(payload).await
    }

    /// Closes the connection.
    ///
    /// Does nothing when not connected.
    pub async fn disconnect(&self) {
        let connection = self.inner.connection.lock().take();

        match connection {
            Some(connection) => {
                connection.shutdown().await;
                info!(peer = %connection.peer_addr(), "Disconnected from server");
            }
            None => {
                trace!("Client already disconnected");
            }
        }
    }

    /// Returns `true` while a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner
            .connection
            .lock()
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
    }

    /// Returns the local address of the current connection.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .connection
            .lock()
            .as_ref()
            .map(|connection| connection.local_addr())
    }

    /// Returns the server address of the current connection.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner
            .connection
            .lock()
            .as_ref()
            .map(|connection| connection.peer_addr())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.inner.root.cancel();
    }
}

// ============================================================================
// Background Loops
// ============================================================================

/// Delivers frames from the server until the connection ends.
async fn receive_loop(
    inner: Arc<ClientInner>,
    connection: Arc<Connection>,
    mut reader: FrameReader<OwnedReadHalf>,
) {
    loop {
        tokio::select! {
            () = connection.closed() => break,

            frame = reader.receive() => match frame {
                Ok(frame) => (inner.on_message)(frame),

                Err(Error::StreamClosed) => {
                    debug!(peer = %connection.peer_addr(), "Server closed the connection");
                    break;
                }

                Err(e) => {
                    handler::report(inner.error_sink.as_ref(), e);
                    if inner.options.close_on_read_error {
                        connection.close();
                    }
                    break;
                }
            }
        }
    }

    debug!("Receive loop terminated");
}

/// Sends a heartbeat every interval until the connection ends.
async fn heartbeat_loop(inner: Arc<ClientInner>, connection: Arc<Connection>) {
    let period = inner.options.heartbeat_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = connection.closed() => break,

            _ = ticker.tick() => {
                if let Err(e) = connection.send(HEARTBEAT).await {
                    if !connection.is_closed() {
                        handler::report(inner.error_sink.as_ref(), e);
                    }
                    connection.close();
                    break;
                }
                trace!("Heartbeat sent");
            }
        }
    }

    debug!("Heartbeat loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
