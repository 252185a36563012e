//! Error types for pulsewire.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pulsewire::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.connect("127.0.0.1", 8080).await?;
//!     client.write(b"hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidState`] |
//! | Startup | [`Error::Bind`], [`Error::Connect`], [`Error::ConnectionTimeout`] |
//! | Connection | [`Error::Accept`], [`Error::NotConnected`], [`Error::ConnectionClosed`], [`Error::StreamClosed`] |
//! | Pool | [`Error::CapacityExceeded`], [`Error::ClientNotFound`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::ClientId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by the builders when options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Operation not allowed in the current lifecycle state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// Server failed to bind its listener.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: IoError,
    },

    /// Client failed to dial the server.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: IoError,
    },

    /// Client dial did not complete within the connect timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Listener failed to accept a connection.
    ///
    /// Non-fatal; reported through the error sink.
    #[error("Failed to accept connection: {source}")]
    Accept {
        /// Underlying socket error.
        #[source]
        source: IoError,
    },

    /// Client operation attempted without an established connection.
    #[error("Not connected")]
    NotConnected,

    /// Write attempted on a connection that has already been closed locally.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Peer shut the stream down cleanly.
    ///
    /// Expected terminal condition of every connection.
    #[error("Stream closed by peer")]
    StreamClosed,

    // ========================================================================
    // Pool Errors
    // ========================================================================
    /// Connection pool is full.
    #[error("Maximum number of clients reached ({max_clients})")]
    CapacityExceeded {
        /// Configured capacity of the pool.
        max_clients: usize,
    },

    /// No registered connection with this identity.
    #[error("Client not found: {client_id}")]
    ClientNotFound {
        /// The missing client identity.
        client_id: ClientId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON deserialization error (options loading).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    #[inline]
    pub fn bind(addr: impl Into<String>, source: IoError) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    /// Creates a connect error.
    #[inline]
    pub fn connect(addr: impl Into<String>, source: IoError) -> Self {
        Self::Connect {
            addr: addr.into(),
            source,
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an accept error.
    #[inline]
    pub fn accept(source: IoError) -> Self {
        Self::Accept { source }
    }

    /// Creates a capacity exceeded error.
    #[inline]
    pub fn capacity_exceeded(max_clients: usize) -> Self {
        Self::CapacityExceeded { max_clients }
    }

    /// Creates a client not found error.
    #[inline]
    pub fn client_not_found(client_id: ClientId) -> Self {
        Self::ClientNotFound { client_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error aborted a `start` or `connect` call.
    #[inline]
    #[must_use]
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::Connect { .. } | Self::ConnectionTimeout { .. }
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::ConnectionTimeout { .. }
                | Self::Accept { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::StreamClosed
        )
    }

    /// Returns `true` for conditions that are part of normal operation.
    ///
    /// A peer hanging up and a full pool are expected and should not be
    /// surfaced as application errors.
    #[inline]
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::StreamClosed | Self::CapacityExceeded { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::capacity_exceeded(2);
        assert_eq!(err.to_string(), "Maximum number of clients reached (2)");

        let err = Error::client_not_found(ClientId::new(7));
        assert_eq!(err.to_string(), "Client not found: 7");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("max_clients must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: max_clients must be at least 1"
        );
    }

    #[test]
    fn test_bind_error_keeps_source() {
        let err = Error::bind(
            "127.0.0.1:80",
            IoError::new(ErrorKind::AddrInUse, "address in use"),
        );
        assert!(err.is_startup_error());
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Failed to bind 127.0.0.1:80"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::StreamClosed.is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_expected() {
        assert!(Error::StreamClosed.is_expected());
        assert!(Error::capacity_exceeded(1).is_expected());
        assert!(!Error::accept(IoError::other("boom")).is_expected());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "broken pipe");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
