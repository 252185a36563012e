//! Builder pattern for server configuration.
//!
//! # Example
//!
//! ```no_run
//! use pulsewire::Server;
//!
//! # fn example() -> pulsewire::Result<()> {
//! let server = Server::builder()
//!     .max_clients(2)
//!     .on_connect(|id| println!("client {id} connected"))
//!     .on_message(|id, msg| println!("client {id}: {}", String::from_utf8_lossy(&msg)))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::handler::{ErrorSink, ServerHandlers};
use crate::identifiers::ClientId;

use super::core::Server;
use super::options::ServerOptions;

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for configuring a [`Server`] instance.
///
/// Use [`Server::builder()`] to create a new builder.
#[derive(Default)]
pub struct ServerBuilder {
    /// Server options.
    options: ServerOptions,
    /// Installed callbacks.
    handlers: ServerHandlers,
    /// Destination of asynchronous errors.
    error_sink: Option<ErrorSink>,
    /// External cancellation signal.
    cancellation: Option<CancellationToken>,
}

// ============================================================================
// ServerBuilder Implementation
// ============================================================================

impl ServerBuilder {
    /// Creates a new builder with default options and no-op callbacks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the maximum number of simultaneously connected clients.
    #[inline]
    #[must_use]
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.options.max_clients = max_clients;
        self
    }

    /// Sets the heartbeat interval clients are expected to use.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_heartbeat_interval(interval);
        self
    }

    /// Sets the callback run for every application frame.
    #[must_use]
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(ClientId, Vec<u8>) + Send + Sync + 'static,
    {
        self.handlers.on_message = Arc::new(handler);
        self
    }

    /// Sets the callback run when a client is registered.
    #[must_use]
    pub fn on_connect<F>(mut self, handler: F) -> Self
    where
        F: Fn(ClientId) + Send + Sync + 'static,
    {
        self.handlers.on_connect = Arc::new(handler);
        self
    }

    /// Sets the callback run once when a registered client goes away.
    #[must_use]
    pub fn on_disconnect<F>(mut self, handler: F) -> Self
    where
        F: Fn(ClientId) + Send + Sync + 'static,
    {
        self.handlers.on_disconnect = Arc::new(handler);
        self
    }

    /// Forwards non-fatal errors to `sink`.
    #[inline]
    #[must_use]
    pub fn error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Ties the server's activities to an external cancellation token.
    ///
    /// Cancelling `token` stops accepting and closes every connection, as if
    /// the server had been dropped.
    #[inline]
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the server with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options are invalid.
    pub fn build(self) -> Result<Server> {
        self.options.validate()?;

        let root = match self.cancellation {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        Ok(Server::new(self.options, self.handlers, self.error_sink, root))
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("options", &self.options)
            .field("error_sink", &self.error_sink.is_some())
            .field("cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    #[test]
    fn test_builder_default() {
        let builder = ServerBuilder::new();
        assert_eq!(builder.options, ServerOptions::default());
        assert!(builder.error_sink.is_none());
    }

    #[test]
    fn test_builder_max_clients() {
        let builder = ServerBuilder::new().max_clients(2);
        assert_eq!(builder.options.max_clients, 2);
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        let result = ServerBuilder::new().max_clients(0).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_builder_builds_idle_server() {
        let server = ServerBuilder::new().max_clients(3).build().unwrap();
        assert_eq!(server.max_clients(), 3);
        assert_eq!(server.client_count(), 0);
    }
}
