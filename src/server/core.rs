//! Server lifecycle and accept loop.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start()──► Listening ──stop()──► Stopped
//!   └──────────────stop()─────────────────┘
//! ```
//!
//! While listening, a dedicated task accepts connections. Each one is either
//! rejected (pool full: the [`REJECTION`] frame is written and the socket
//! closed) or registered under the lowest free [`ClientId`] and handed to
//! its own session task.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::handler::{self, ErrorSink, ServerHandlers};
use crate::identifiers::ClientId;
use crate::protocol::{FrameWriter, REJECTION};
use crate::transport::{Connection, ConnectionPool};

use super::builder::ServerBuilder;
use super::options::ServerOptions;
use super::session;

// ============================================================================
// ServerState
// ============================================================================

/// Observable lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Built but not started.
    Idle,
    /// Accepting connections.
    Listening,
    /// Stopped; cannot be restarted.
    Stopped,
}

/// Lifecycle state with the resources owned in each phase.
enum Lifecycle {
    Idle,
    Listening {
        /// Parent of the accept loop and every connection.
        token: CancellationToken,
        local_addr: SocketAddr,
    },
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> ServerState {
        match self {
            Self::Idle => ServerState::Idle,
            Self::Listening { .. } => ServerState::Listening,
            Self::Stopped => ServerState::Stopped,
        }
    }
}

// ============================================================================
// ServerInner
// ============================================================================

/// Internal shared state for the server.
pub(crate) struct ServerInner {
    /// Server options.
    pub options: ServerOptions,

    /// Registered connections.
    pub pool: ConnectionPool,

    /// User callbacks.
    pub handlers: ServerHandlers,

    /// Destination of asynchronous errors.
    pub error_sink: Option<ErrorSink>,

    /// Cancelled when the server is dropped or the external token fires.
    root: CancellationToken,

    /// Current lifecycle phase.
    lifecycle: Mutex<Lifecycle>,

    /// Accept loop, session and rejection tasks.
    tasks: TaskTracker,
}

// ============================================================================
// Server
// ============================================================================

/// TCP server multiplexing a bounded number of heartbeating clients.
///
/// # Example
///
/// ```no_run
/// use pulsewire::Server;
///
/// # async fn example() -> pulsewire::Result<()> {
/// let server = Server::builder()
///     .max_clients(2)
///     .on_message(|id, msg| println!("{id}: {}", String::from_utf8_lossy(&msg)))
///     .build()?;
///
/// let addr = server.start("127.0.0.1", 8080).await?;
/// println!("listening on {addr}");
///
/// server.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    /// Shared inner state.
    pub(crate) inner: Arc<ServerInner>,
}

// ============================================================================
// Server - Display
// ============================================================================

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("client_count", &self.client_count())
            .field("max_clients", &self.max_clients())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Server - Constructor
// ============================================================================

impl Server {
    /// Creates a configuration builder for the server.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Creates an idle server. Called by [`ServerBuilder::build`].
    pub(crate) fn new(
        options: ServerOptions,
        handlers: ServerHandlers,
        error_sink: Option<ErrorSink>,
        root: CancellationToken,
    ) -> Self {
        let pool = ConnectionPool::new(options.max_clients);

        Self {
            inner: Arc::new(ServerInner {
                options,
                pool,
                handlers,
                error_sink,
                root,
                lifecycle: Mutex::new(Lifecycle::Idle),
                tasks: TaskTracker::new(),
            }),
        }
    }
}

// ============================================================================
// Server - Lifecycle
// ============================================================================

impl Server {
    /// Binds `host:port` and starts accepting connections.
    ///
    /// Use port 0 to let the OS pick a free port; the bound address is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the server was already started or stopped
    /// - [`Error::Bind`] if the address is unavailable
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr> {
        self.ensure_idle()?;

        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::bind(&addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| Error::bind(&addr, e))?;

        let token = self.inner.root.child_token();
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return Err(Error::invalid_state(format!(
                    "server is {:?}",
                    lifecycle.state()
                )));
            }
            *lifecycle = Lifecycle::Listening {
                token: token.clone(),
                local_addr,
            };
        }

        info!(
            %local_addr,
            max_clients = self.inner.options.max_clients,
            "Server listening"
        );

        let inner = Arc::clone(&self.inner);
        self.inner.tasks.spawn(inner.accept_loop(listener, token));

        Ok(local_addr)
    }

    /// Stops accepting and closes every connection.
    ///
    /// Each open connection goes through its normal teardown, so the
    /// disconnect callback fires once per client. Returns after the accept
    /// loop and all sessions have finished. Calling `stop` again does
    /// nothing.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.inner.lifecycle.lock(), Lifecycle::Stopped);

        match previous {
            Lifecycle::Listening { token, local_addr } => {
                info!(%local_addr, "Server stopping");

                token.cancel();

                for (client_id, connection) in self.inner.pool.drain() {
                    connection.close();
                    debug!(client_id = %client_id, "Connection closed during shutdown");
                }

                self.inner.tasks.close();
                self.inner.tasks.wait().await;

                info!(%local_addr, "Server stopped");
            }
            Lifecycle::Idle => {
                debug!("Server stopped before start");
            }
            Lifecycle::Stopped => {
                trace!("Server already stopped");
            }
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.inner.lifecycle.lock().state()
    }

    /// Returns the bound address while listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.inner.lifecycle.lock() {
            Lifecycle::Listening { local_addr, .. } => Some(local_addr),
            _ => None,
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        let state = self.state();
        if state == ServerState::Idle {
            Ok(())
        } else {
            Err(Error::invalid_state(format!("server is {state:?}")))
        }
    }
}

// ============================================================================
// Server - Public API
// ============================================================================

impl Server {
    /// Sends a payload to one client.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientNotFound`] if no client holds `client_id`
    /// - [`Error::ConnectionClosed`] if the connection is being torn down
    /// - [`Error::Io`] if the write fails
    pub async fn write_to_client(&self, client_id: ClientId, payload: &[u8]) -> Result<()> {
        let connection = self.inner.pool.get(client_id)?;
        connection.send(payload).await
    }

    /// Returns the identities of all connected clients, ascending.
    #[inline]
    #[must_use]
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.inner.pool.ids()
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.pool.len()
    }

    /// Returns the configured capacity.
    #[inline]
    #[must_use]
    pub fn max_clients(&self) -> usize {
        self.inner.pool.max_clients()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.inner.root.cancel();
    }
}

// ============================================================================
// ServerInner - Accept Loop
// ============================================================================

impl ServerInner {
    /// Background task that accepts new connections until `token` fires.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener, token: CancellationToken) {
        debug!("Accept loop started");

        loop {
            let accepted = tokio::select! {
                () = token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => self.admit(stream, addr, &token),
                Err(e) => handler::report(self.error_sink.as_ref(), Error::accept(e)),
            }
        }

        debug!("Accept loop terminated");
    }

    /// Registers a new connection or turns it away.
    fn admit(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr, token: &CancellationToken) {
        if self.pool.is_full() {
            info!(
                ?addr,
                max_clients = self.pool.max_clients(),
                "Max clients reached, rejecting connection"
            );
            self.tasks.spawn(reject(stream, addr));
            return;
        }

        let (connection, reader) = match Connection::from_stream(stream, token.child_token()) {
            Ok(pair) => pair,
            Err(e) => {
                debug!(?addr, error = %e, "Connection lost before registration");
                return;
            }
        };
        let connection = Arc::new(connection);

        let client_id = match self.pool.register(Arc::clone(&connection)) {
            Ok(client_id) => client_id,
            Err(e) => {
                info!(?addr, error = %e, "Rejecting connection");
                drop(reader);
                self.tasks.spawn(async move {
                    if let Err(e) = connection.send(REJECTION).await {
                        debug!(?addr, error = %e, "Failed to send rejection");
                    }
                    connection.shutdown().await;
                });
                return;
            }
        };

        info!(client_id = %client_id, ?addr, "Client connected");
        self.handlers.connected(client_id);

        self.tasks.spawn(session::run(
            Arc::clone(self),
            client_id,
            connection,
            reader,
        ));
    }
}

/// Writes the rejection frame and closes the socket.
async fn reject(stream: TcpStream, addr: SocketAddr) {
    let mut writer = FrameWriter::new(stream);

    if let Err(e) = writer.send(REJECTION).await {
        debug!(?addr, error = %e, "Failed to send rejection");
    }
    if let Err(e) = writer.shutdown().await {
        debug!(?addr, error = %e, "Socket shutdown failed");
    }
}

// ============================================================================
// Tests
// ============================================================================
