//! Multiplexing TCP server.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Server`] | Accept loop, client registry and per-client sessions |
//! | [`ServerBuilder`] | Fluent configuration builder |
//! | [`ServerOptions`] | Capacity and heartbeat settings |
//! | [`ServerState`] | Lifecycle state |
//!
//! # Example
//!
//! ```no_run
//! use pulsewire::Server;
//!
//! # async fn example() -> pulsewire::Result<()> {
//! let server = Server::builder()
//!     .max_clients(2)
//!     .on_connect(|id| println!("client {id} connected"))
//!     .on_disconnect(|id| println!("client {id} disconnected"))
//!     .build()?;
//!
//! server.start("0.0.0.0", 8080).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for server configuration.
pub mod builder;

/// Server lifecycle and accept loop.
pub mod core;

/// Server options.
pub mod options;

/// Per-connection receive loop and teardown.
mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ServerBuilder;
pub use self::core::{Server, ServerState};
pub use options::{DEFAULT_MAX_CLIENTS, ServerOptions};
