//! Per-connection session.
//!
//! One task per registered client. It owns the read half of the socket and
//! a [`Watchdog`]:
//!
//! - heartbeat frame → watchdog refreshed, nothing delivered
//! - any other frame → message callback
//! - peer hang-up or read error → teardown
//! - watchdog expiry, server stop or cancellation → connection closed →
//!   teardown
//!
//! Teardown runs once per connection whichever of these happens first.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::handler;
use crate::identifiers::ClientId;
use crate::protocol::{FrameReader, is_heartbeat};
use crate::transport::{Connection, Watchdog};

use super::core::ServerInner;

// ============================================================================
// Session
// ============================================================================

/// Runs the receive loop of one client until the connection ends.
pub(crate) async fn run(
    server: Arc<ServerInner>,
    client_id: ClientId,
    connection: Arc<Connection>,
    mut reader: FrameReader<OwnedReadHalf>,
) {
    let watchdog = {
        let connection = Arc::clone(&connection);
        Watchdog::spawn(server.options.liveness_timeout(), move || {
            warn!(client_id = %client_id, "Heartbeat not received, closing connection");
            connection.close();
        })
    };

    loop {
        tokio::select! {
            () = connection.closed() => {
                debug!(client_id = %client_id, "Session closed");
                break;
            }

            frame = reader.receive() => match frame {
                Ok(frame) if is_heartbeat(&frame) => {
                    trace!(client_id = %client_id, "Heartbeat received");
                    watchdog.refresh();
                }

                Ok(frame) => {
                    server.handlers.message(client_id, frame);
                }

                Err(Error::StreamClosed) => {
                    debug!(client_id = %client_id, "Client closed the connection");
                    break;
                }

                Err(e) => {
                    handler::report(server.error_sink.as_ref(), e);
                    break;
                }
            }
        }
    }

    drop(watchdog);
    drop(reader);

    teardown(&server, client_id, &connection).await;
}

/// Closes the connection, frees its identity, fires the disconnect
/// callback and shuts the socket down. Does nothing if the connection was
/// already torn down.
///
/// The identity is free before the socket shutdown starts.
async fn teardown(server: &ServerInner, client_id: ClientId, connection: &Arc<Connection>) {
    if !connection.begin_teardown() {
        trace!(client_id = %client_id, "Connection already torn down");
        return;
    }

    connection.close();
    server.pool.release(client_id, connection);

    info!(client_id = %client_id, "Client disconnected");
    server.handlers.disconnected(client_id);

    connection.shutdown().await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::sync::CancellationToken;

    use crate::handler::ServerHandlers;
    use crate::protocol::{FrameWriter, HEARTBEAT};
    use crate::server::{Server, ServerOptions};

    struct Fixture {
        server: Server,
        connection: Arc<Connection>,
        reader: FrameReader<OwnedReadHalf>,
        peer: FrameWriter<TcpStream>,
        messages: Arc<Mutex<Vec<(ClientId, Vec<u8>)>>>,
        disconnects: Arc<AtomicUsize>,
    }

    async fn fixture(heartbeat_interval: Duration) -> Fixture {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let disconnects = Arc::new(AtomicUsize::new(0));

        let handlers = ServerHandlers {
            on_message: {
                let messages = Arc::clone(&messages);
                Arc::new(move |id, payload| messages.lock().push((id, payload)))
            },
            on_disconnect: {
                let disconnects = Arc::clone(&disconnects);
                Arc::new(move |_| {
                    disconnects.fetch_add(1, Ordering::SeqCst);
                })
            },
            ..ServerHandlers::default()
        };
        let options = ServerOptions::new()
            .with_max_clients(1)
            .with_heartbeat_interval(heartbeat_interval);
        let server = Server::new(options, handlers, None, CancellationToken::new());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (dialed, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (connection, reader) =
            Connection::from_stream(accepted.unwrap().0, CancellationToken::new()).unwrap();
        let connection = Arc::new(connection);
        server.inner.pool.register(Arc::clone(&connection)).unwrap();

        Fixture {
            server,
            connection,
            reader,
            peer: FrameWriter::new(dialed.unwrap()),
            messages,
            disconnects,
        }
    }

    #[tokio::test]
    async fn test_messages_delivered_heartbeats_filtered() {
        let Fixture {
            server,
            connection,
            reader,
            mut peer,
            messages,
            disconnects,
        } = fixture(Duration::from_millis(500)).await;
        let session = tokio::spawn(run(
            Arc::clone(&server.inner),
            ClientId::FIRST,
            Arc::clone(&connection),
            reader,
        ));

        peer.send(b"first").await.unwrap();
        peer.send(HEARTBEAT).await.unwrap();
        peer.send(b"second").await.unwrap();
        peer.shutdown().await.unwrap();
        session.await.unwrap();

        let received = messages.lock().clone();
        assert_eq!(
            received,
            vec![
                (ClientId::FIRST, b"first".to_vec()),
                (ClientId::FIRST, b"second".to_vec()),
            ]
        );
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_silent_peer_is_evicted() {
        let Fixture {
            server,
            connection,
            reader,
            peer: _peer,
            disconnects,
            ..
        } = fixture(Duration::from_millis(50)).await;

        let session = tokio::spawn(run(
            Arc::clone(&server.inner),
            ClientId::FIRST,
            Arc::clone(&connection),
            reader,
        ));

        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session should end after the liveness timeout")
            .unwrap();

        assert!(connection.is_closed());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_eviction_with_stalled_write() {
        let Fixture {
            server,
            connection,
            reader,
            peer: _peer,
            disconnects,
            ..
        } = fixture(Duration::from_millis(50)).await;

        // The peer never reads, so this writer ends up blocked on the socket.
        let writer = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move {
                let chunk = vec![b'x'; 1 << 20];
                while connection.send(&chunk).await.is_ok() {}
            })
        };
        let session = tokio::spawn(run(
            Arc::clone(&server.inner),
            ClientId::FIRST,
            Arc::clone(&connection),
            reader,
        ));

        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session should end despite the stalled write")
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), writer)
            .await
            .expect("stalled write should be abandoned")
            .unwrap();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_runs_once() {
        let Fixture {
            server,
            connection,
            disconnects,
            ..
        } = fixture(Duration::from_millis(500)).await;

        teardown(&server.inner, ClientId::FIRST, &connection).await;
        teardown(&server.inner, ClientId::FIRST, &connection).await;

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(server.client_count(), 0);
    }
}
