//! Client configuration.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{HEARTBEAT_INTERVAL, saturating_millis};

// ============================================================================
// Constants
// ============================================================================

/// Time allowed for dialing the server when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ClientOptions
// ============================================================================

/// Client configuration options.
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Time allowed for dialing the server, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Interval between heartbeats, in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Close the connection when the receive loop fails with an I/O error.
    pub close_on_read_error: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL.as_millis() as u64,
            close_on_read_error: false,
        }
    }

    /// Parses options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = saturating_millis(interval);
        self
    }

    /// Closes the connection when a read fails.
    #[inline]
    #[must_use]
    pub fn with_close_on_read_error(mut self) -> Self {
        self.close_on_read_error = true;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientOptions {
    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Checks the options for values the client cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the heartbeat interval or the connect
    /// timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::config("heartbeat interval must be non-zero"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::config("connect timeout must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.connect_timeout(), Duration::from_secs(5));
        assert_eq!(options.heartbeat_interval(), Duration::from_millis(500));
        assert!(!options.close_on_read_error);
    }

    #[test]
    fn test_builder_methods() {
        let options = ClientOptions::new()
            .with_connect_timeout(Duration::from_millis(250))
            .with_heartbeat_interval(Duration::from_millis(100))
            .with_close_on_read_error();

        assert_eq!(options.connect_timeout_ms, 250);
        assert_eq!(options.heartbeat_interval_ms, 100);
        assert!(options.close_on_read_error);
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let options = ClientOptions::new().with_connect_timeout(Duration::MAX);
        assert_eq!(options.connect_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_from_json() {
        let options = ClientOptions::from_json(r#"{ "connect_timeout_ms": 1000 }"#).unwrap();
        assert_eq!(options.connect_timeout(), Duration::from_secs(1));
        assert_eq!(options.heartbeat_interval_ms, 500);
    }

    #[test]
    fn test_validate() {
        assert!(ClientOptions::new().validate().is_ok());
        assert!(matches!(
            ClientOptions::new()
                .with_heartbeat_interval(Duration::ZERO)
                .validate(),
            Err(Error::Config { .. })
        ));
    }
}
