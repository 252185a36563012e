//! TCP transport layer.
//!
//! Building blocks shared by [`Server`](crate::Server) and
//! [`Client`](crate::Client).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌──────────────────┐
//! │  Client          │                              │  Server          │
//! │                  │        TCP, '\n' frames      │                  │
//! │  receive loop    │◄────────────────────────────►│  ConnectionPool  │
//! │  heartbeat loop  │   "H34RTB34T\n" every 500ms  │  → session       │
//! │                  │                              │  → Watchdog      │
//! └──────────────────┘                              └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Shared write half and close signal of one socket |
//! | `pool` | Bounded identity → connection registry |
//! | `watchdog` | Heartbeat deadline timer |

// ============================================================================
// Submodules
// ============================================================================

/// Shared write half and close signal of one socket.
pub mod connection;

/// Bounded registry of live server connections.
pub mod pool;

/// Per-connection liveness watchdog.
pub mod watchdog;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use pool::ConnectionPool;
pub use watchdog::Watchdog;
