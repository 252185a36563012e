//! Builder pattern for client configuration.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::handler::{ClientMessageHandler, ErrorSink};

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
pub struct ClientBuilder {
    /// Client options.
    options: ClientOptions,
    /// Message callback.
    on_message: ClientMessageHandler,
    /// Destination of asynchronous errors.
    error_sink: Option<ErrorSink>,
    /// External cancellation signal.
    cancellation: Option<CancellationToken>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            options: ClientOptions::default(),
            on_message: Arc::new(|_| {}),
            error_sink: None,
            cancellation: None,
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default options and a no-op callback.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the time allowed for dialing the server.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_connect_timeout(timeout);
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_heartbeat_interval(interval);
        self
    }

    /// Closes the connection when the receive loop hits an I/O error.
    #[inline]
    #[must_use]
    pub fn close_on_read_error(mut self) -> Self {
        self.options = self.options.with_close_on_read_error();
        self
    }

    /// Sets the callback run for every frame received from the server.
    #[must_use]
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        self.on_message = Arc::new(handler);
        self
    }

    /// Forwards non-fatal errors to `sink`.
    #[inline]
    #[must_use]
    pub fn error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Ties the client's activities to an external cancellation token.
    #[inline]
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options are invalid.
    pub fn build(self) -> Result<Client> {
        self.options.validate()?;

        let root = match self.cancellation {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        Ok(Client::new(
            self.options,
            self.on_message,
            self.error_sink,
            root,
        ))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
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
    fn test_builder_options() {
        let builder = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .heartbeat_interval(Duration::from_millis(100))
            .close_on_read_error();

        assert_eq!(builder.options.connect_timeout_ms, 1000);
        assert_eq!(builder.options.heartbeat_interval_ms, 100);
        assert!(builder.options.close_on_read_error);
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = ClientBuilder::new()
            .heartbeat_interval(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
