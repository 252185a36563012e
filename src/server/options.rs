//! Server configuration.
//!
//! # Example
//!
//! ```ignore
//! use pulsewire::ServerOptions;
//!
//! let options = ServerOptions::new().with_max_clients(2);
//!
//! let options = ServerOptions::from_json(r#"{ "max_clients": 64 }"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{HEARTBEAT_INTERVAL, liveness_timeout, saturating_millis};

// ============================================================================
// Constants
// ============================================================================

/// Capacity used when none is configured.
pub const DEFAULT_MAX_CLIENTS: usize = 16;

// ============================================================================
// ServerOptions
// ============================================================================

/// Server configuration options.
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Maximum number of simultaneously registered clients.
    pub max_clients: usize,

    /// Heartbeat interval the clients are expected to use, in milliseconds.
    ///
    /// Connections silent for twice this long are evicted.
    pub heartbeat_interval_ms: u64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ServerOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL.as_millis() as u64,
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

impl ServerOptions {
    /// Sets the maximum number of clients.
    #[inline]
    #[must_use]
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Sets the expected heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = saturating_millis(interval);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ServerOptions {
    /// Returns the expected heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Returns the silence after which a connection is evicted.
    #[inline]
    #[must_use]
    pub fn liveness_timeout(&self) -> Duration {
        liveness_timeout(self.heartbeat_interval())
    }

    /// Checks the options for values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_clients` or the heartbeat interval
    /// is zero, or if `max_clients` exceeds the number of
    /// [`ClientId`](crate::ClientId)s.
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(Error::config("max_clients must be at least 1"));
        }
        if u32::try_from(self.max_clients).is_err() {
            return Err(Error::config(format!(
                "max_clients must not exceed {}",
                u32::MAX
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::config("heartbeat interval must be non-zero"));
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
        let options = ServerOptions::default();
        assert_eq!(options.max_clients, DEFAULT_MAX_CLIENTS);
        assert_eq!(options.heartbeat_interval(), Duration::from_millis(500));
        assert_eq!(options.liveness_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn test_builder_methods() {
        let options = ServerOptions::new()
            .with_max_clients(2)
            .with_heartbeat_interval(Duration::from_millis(100));

        assert_eq!(options.max_clients, 2);
        assert_eq!(options.liveness_timeout(), Duration::from_millis(200));
    }

    #[test]
    fn test_from_json_partial() {
        let options = ServerOptions::from_json(r#"{ "max_clients": 64 }"#).unwrap();
        assert_eq!(options.max_clients, 64);
        assert_eq!(options.heartbeat_interval_ms, 500);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            ServerOptions::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(ServerOptions::new().validate().is_ok());
        assert!(matches!(
            ServerOptions::new().with_max_clients(0).validate(),
            Err(Error::Config { .. })
        ));
        assert!(
            ServerOptions::new()
                .with_heartbeat_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_validate_rejects_more_clients_than_ids() {
        let too_many = u32::MAX as usize + 1;

        assert!(matches!(
            ServerOptions::new().with_max_clients(too_many).validate(),
            Err(Error::Config { .. })
        ));
        assert!(
            ServerOptions::new()
                .with_max_clients(u32::MAX as usize)
                .validate()
                .is_ok()
        );
    }
}
