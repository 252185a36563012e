//! Shared helpers for integration tests.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

use pulsewire::{Client, ClientId, Server, ServerBuilder};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Server Fixture
// ============================================================================

/// Server callbacks recorded as channel messages.
pub struct ServerEvents {
    pub connects: UnboundedReceiver<ClientId>,
    pub disconnects: UnboundedReceiver<ClientId>,
    pub messages: UnboundedReceiver<(ClientId, Vec<u8>)>,
    pub errors: UnboundedReceiver<pulsewire::Error>,
}

/// Returns a builder whose callbacks feed a [`ServerEvents`].
pub fn recording_server(max_clients: usize) -> (ServerBuilder, ServerEvents) {
    let (connect_tx, connects) = mpsc::unbounded_channel();
    let (disconnect_tx, disconnects) = mpsc::unbounded_channel();
    let (message_tx, messages) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::unbounded_channel();

    let builder = Server::builder()
        .max_clients(max_clients)
        .on_connect(move |id| {
            let _ = connect_tx.send(id);
        })
        .on_disconnect(move |id| {
            let _ = disconnect_tx.send(id);
        })
        .on_message(move |id, payload| {
            let _ = message_tx.send((id, payload));
        })
        .error_sink(error_tx);

    (
        builder,
        ServerEvents {
            connects,
            disconnects,
            messages,
            errors,
        },
    )
}

/// Builds and starts a recording server on a random localhost port.
pub async fn start_server(max_clients: usize) -> (Server, SocketAddr, ServerEvents) {
    init_tracing();
    let (builder, events) = recording_server(max_clients);
    let server = builder.build().expect("valid options");
    let addr = server.start("127.0.0.1", 0).await.expect("bind localhost");
    (server, addr, events)
}

// ============================================================================
// Client Helpers
// ============================================================================

/// Connects a default client to `addr`.
pub async fn connect_client(addr: SocketAddr) -> Client {
    let client = Client::builder().build().expect("valid options");
    client
        .connect("127.0.0.1", addr.port())
        .await
        .expect("connect to test server");
    client
}

/// Connects a plain TCP socket that never sends heartbeats.
pub async fn connect_silent(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("connect to test server")
}

// ============================================================================
// Waiting
// ============================================================================

/// Waits for the next value on `rx`, panicking after [`EVENT_TIMEOUT`].
pub async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Asserts that nothing arrives on `rx` within `window`.
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>, window: Duration) {
    if let Ok(Some(value)) = timeout(window, rx.recv()).await {
        panic!("unexpected event: {value:?}");
    }
}
