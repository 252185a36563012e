//! Bounded registry of live server connections.
//!
//! Maps each [`ClientId`] to its [`Connection`]. Identities are allocated
//! lowest-free-first, so they are reused as soon as a connection leaves.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           ConnectionPool                │
//! │         (max_clients = 3)               │
//! │  ┌─────────────────────────────────┐   │
//! │  │ ClientId=0 → Connection A       │   │
//! │  │ ClientId=1 → (free)             │   │
//! │  │ ClientId=2 → Connection C       │   │
//! │  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────┘
//!   next register() → ClientId=1
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::transport::Connection;

// ============================================================================
// Types
// ============================================================================

/// Map of client identities to their connections.
type ConnectionMap = FxHashMap<ClientId, Arc<Connection>>;

// ============================================================================
// ConnectionPool
// ============================================================================

/// Registry of live connections keyed by [`ClientId`].
///
/// Thread-safe; shared by the accept loop and every session.
pub struct ConnectionPool {
    /// Maximum number of registered connections.
    max_clients: usize,

    /// Active connections by client ID.
    connections: RwLock<ConnectionMap>,
}

// ============================================================================
// ConnectionPool - Constructor
// ============================================================================

impl ConnectionPool {
    /// Creates an empty pool holding at most `max_clients` connections.
    #[must_use]
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            connections: RwLock::new(ConnectionMap::default()),
        }
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl ConnectionPool {
    /// Returns the configured capacity.
    #[inline]
    #[must_use]
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Returns the number of registered connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if no connection is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns `true` if no further connection can be registered.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_clients
    }

    /// Registers a connection under the lowest free identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the pool is full. The pool is
    /// left unchanged.
    pub fn register(&self, connection: Arc<Connection>) -> Result<ClientId> {
        let mut connections = self.connections.write();

        if connections.len() >= self.max_clients {
            return Err(Error::capacity_exceeded(self.max_clients));
        }

        let client_id = lowest_free_id(&connections)
            .ok_or_else(|| Error::capacity_exceeded(self.max_clients))?;
        connections.insert(client_id, connection);

        trace!(client_id = %client_id, count = connections.len(), "Connection registered");
        Ok(client_id)
    }

    /// Removes a connection.
    ///
    /// Returns the removed connection, or `None` if the identity was not
    /// registered.
    pub fn unregister(&self, client_id: ClientId) -> Option<Arc<Connection>> {
        let removed = self.connections.write().remove(&client_id);

        if removed.is_none() {
            debug!(client_id = %client_id, "Connection already removed from pool");
        }

        removed
    }

    /// Removes `client_id` only if it still maps to `connection`.
    ///
    /// Returns `true` if an entry was removed.
    pub(crate) fn release(&self, client_id: ClientId, connection: &Arc<Connection>) -> bool {
        let mut connections = self.connections.write();

        match connections.get(&client_id) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                connections.remove(&client_id);
                true
            }
            _ => {
                debug!(client_id = %client_id, "Connection already removed from pool");
                false
            }
        }
    }

    /// Looks up a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientNotFound`] if the identity is not registered.
    pub fn get(&self, client_id: ClientId) -> Result<Arc<Connection>> {
        self.connections
            .read()
            .get(&client_id)
            .cloned()
            .ok_or_else(|| Error::client_not_found(client_id))
    }

    /// Returns a snapshot of the registered identities in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.connections.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Removes and returns every registered connection.
    pub fn drain(&self) -> Vec<(ClientId, Arc<Connection>)> {
        self.connections.write().drain().collect()
    }
}

// ============================================================================
// Identity Allocation
// ============================================================================

/// Returns the smallest identity not present in `connections`, or `None`
/// if every `u32` identity is taken.
fn lowest_free_id(connections: &ConnectionMap) -> Option<ClientId> {
    let mut candidate = ClientId::FIRST;
    while connections.contains_key(&candidate) {
        candidate = candidate.next()?;
    }
    Some(candidate)
}

// ============================================================================
// Tests
// ============================================================================
