//! pulsewire - multiplexing TCP transport with heartbeat liveness.
//!
//! A [`Server`] accepts up to `max_clients` concurrent TCP connections,
//! gives each one a small integer [`ClientId`] and evicts connections that
//! stop sending heartbeats. A [`Client`] dials a server, sends a heartbeat
//! every 500 ms and exchanges messages with it.
//!
//! # Wire Protocol
//!
//! - Every frame is the payload followed by `'\n'`; payloads must not contain
//!   the delimiter.
//! - Clients send `H34RTB34T\n` every 500 ms. A server closes a connection
//!   that stays silent for 1000 ms.
//! - A client connecting to a full server receives
//!   `Maximum number of clients reached\n` and is disconnected.
//!
//! # Quick Start
//!
//! ```no_run
//! use pulsewire::{Client, Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::builder()
//!         .max_clients(2)
//!         .on_message(|id, msg| println!("{id}: {}", String::from_utf8_lossy(&msg)))
//!         .build()?;
//!     let addr = server.start("127.0.0.1", 0).await?;
//!
//!     let client = Client::builder().build()?;
//!     client.connect("127.0.0.1", addr.port()).await?;
//!     client.write(b"hello").await?;
//!
//!     client.disconnect().await;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`server`] | [`Server`], its builder and options |
//! | [`client`] | [`Client`], its builder and options |
//! | [`transport`] | Connections, connection pool and watchdog |
//! | [`protocol`] | Framing and reserved frames |
//! | [`handler`] | Callback types and the error sink |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`ClientId`] |

// ============================================================================
// Modules
// ============================================================================

/// Client for a pulsewire server.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Callback types and the asynchronous error sink.
pub mod handler;

/// Type-safe identifiers.
pub mod identifiers;

/// Framing and reserved frames.
pub mod protocol;

/// Multiplexing TCP server.
pub mod server;

/// Connections, connection pool and liveness watchdog.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions};

// Server types
pub use server::{Server, ServerBuilder, ServerOptions, ServerState};

// Callback types
pub use handler::{ClientMessageHandler, ErrorSink, LifecycleHandler, MessageHandler};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ClientId;

// Cancellation signal accepted by the builders
pub use tokio_util::sync::CancellationToken;
