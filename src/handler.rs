//! Callback dispatch and the asynchronous error sink.
//!
//! User code observes the transport through plain closures: one for each
//! received message and one per lifecycle event. Callbacks run on the task
//! that owns the connection, so they may be invoked concurrently for
//! different connections and must not block for long.
//!
//! Non-fatal errors that happen after `start`/`connect` returned (accept
//! failures, read and heartbeat write failures) are logged and, when an
//! [`ErrorSink`] is configured, forwarded to it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::Error;
use crate::identifiers::ClientId;

// ============================================================================
// Types
// ============================================================================

/// Server message callback, called with the sender's identity and payload.
pub type MessageHandler = Arc<dyn Fn(ClientId, Vec<u8>) + Send + Sync>;

/// Server lifecycle callback, called with the affected identity.
pub type LifecycleHandler = Arc<dyn Fn(ClientId) + Send + Sync>;

/// Client message callback.
pub type ClientMessageHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Receiving end of asynchronous errors.
pub type ErrorSink = mpsc::UnboundedSender<Error>;

// ============================================================================
// ServerHandlers
// ============================================================================

/// Callbacks installed on a server.
#[derive(Clone)]
pub(crate) struct ServerHandlers {
    pub on_message: MessageHandler,
    pub on_connect: LifecycleHandler,
    pub on_disconnect: LifecycleHandler,
}

impl Default for ServerHandlers {
    fn default() -> Self {
        Self {
            on_message: Arc::new(|_, _| {}),
            on_connect: Arc::new(|_| {}),
            on_disconnect: Arc::new(|_| {}),
        }
    }
}

impl ServerHandlers {
    /// Delivers an application frame.
    #[inline]
    pub fn message(&self, client_id: ClientId, payload: Vec<u8>) {
        (self.on_message)(client_id, payload);
    }

    /// Announces a newly registered connection.
    #[inline]
    pub fn connected(&self, client_id: ClientId) {
        (self.on_connect)(client_id);
    }

    /// Announces a removed connection.
    #[inline]
    pub fn disconnected(&self, client_id: ClientId) {
        (self.on_disconnect)(client_id);
    }
}

impl fmt::Debug for ServerHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandlers").finish_non_exhaustive()
    }
}

// ============================================================================
// Error Reporting
// ============================================================================

/// Logs `error` and forwards it to `sink`, if any.
///
/// A sink whose receiver was dropped is ignored.
pub(crate) fn report(sink: Option<&ErrorSink>, error: Error) {
    warn!(error = %error, "Transport error");

    if let Some(sink) = sink
        && sink.send(error).is_err()
    {
        trace!("Error sink closed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_handlers_are_noops() {
        let handlers = ServerHandlers::default();
        handlers.message(ClientId::new(0), b"ignored".to_vec());
        handlers.connected(ClientId::new(0));
        handlers.disconnected(ClientId::new(0));
    }

    #[test]
    fn test_handlers_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let handlers = ServerHandlers {
            on_message: Arc::new(move |id, payload| {
                assert_eq!(id, ClientId::new(2));
                assert_eq!(payload, b"hi");
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
            ..ServerHandlers::default()
        };

        handlers.message(ClientId::new(2), b"hi".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_report_forwards_to_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        report(Some(&tx), Error::NotConnected);

        assert!(matches!(rx.try_recv(), Ok(Error::NotConnected)));
    }

    #[test]
    fn test_report_tolerates_missing_or_closed_sink() {
        report(None, Error::NotConnected);

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        report(Some(&tx), Error::NotConnected);
    }
}
