//! Wire protocol shared by server and client.
//!
//! Every message on the wire is a frame: the payload bytes followed by a
//! single [`DELIMITER`] byte. There is no escaping, so a payload must never
//! contain the delimiter itself; doing so splits it into several frames on
//! the receiving side.
//!
//! # Reserved Frames
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | [`HEARTBEAT`] | Client → Server | Liveness pulse, every [`HEARTBEAT_INTERVAL`] |
//! | [`REJECTION`] | Server → Client | Sent once when the pool is full, then closed |
//!
//! A server evicts a connection that has not sent a heartbeat within
//! [`LIVENESS_TIMEOUT`], twice the send interval, so one lost pulse is
//! tolerated.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Delimiter framing over async byte streams |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Submodules
// ============================================================================

/// Delimiter framing over async byte streams.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{FrameReader, FrameWriter, encode};

// ============================================================================
// Constants
// ============================================================================

/// Byte terminating every frame.
pub const DELIMITER: u8 = b'\n';

/// Heartbeat payload.
pub const HEARTBEAT: &[u8] = b"H34RTB34T";

/// Payload sent to a client turned away because the pool is full.
pub const REJECTION: &[u8] = b"Maximum number of clients reached";

/// Interval between heartbeats sent by a client.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Silence after which a server evicts a connection.
pub const LIVENESS_TIMEOUT: Duration = liveness_timeout(HEARTBEAT_INTERVAL);

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if the (delimiter-stripped) frame is a heartbeat.
#[inline]
#[must_use]
pub fn is_heartbeat(frame: &[u8]) -> bool {
    frame == HEARTBEAT
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[inline]
#[must_use]
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Eviction deadline for a given heartbeat interval.
#[inline]
#[must_use]
pub const fn liveness_timeout(heartbeat_interval: Duration) -> Duration {
    heartbeat_interval.saturating_mul(2)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DELIMITER, 0x0A);
        assert_eq!(HEARTBEAT_INTERVAL.as_millis(), 500);
        assert_eq!(LIVENESS_TIMEOUT.as_millis(), 1000);
    }

    #[test]
    fn test_reserved_frames_have_no_delimiter() {
        assert!(!HEARTBEAT.contains(&DELIMITER));
        assert!(!REJECTION.contains(&DELIMITER));
    }

    #[test]
    fn test_is_heartbeat_exact_match() {
        assert!(is_heartbeat(b"H34RTB34T"));
        assert!(!is_heartbeat(b"H34RTB34T\n"));
        assert!(!is_heartbeat(b"H34RTB34"));
        assert!(!is_heartbeat(b"h34rtb34t"));
        assert!(!is_heartbeat(b""));
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::from_micros(999)), 0);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_liveness_timeout_doubles_interval() {
        assert_eq!(
            liveness_timeout(Duration::from_millis(50)),
            Duration::from_millis(100)
        );
    }
}
