//! Type-safe identifiers.
//!
//! [`ClientId`] is the small integer handle the server assigns to each
//! registered connection. Identities are reused: a new connection always
//! receives the smallest identity not currently held by another connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ClientId
// ============================================================================

/// Identity of a server-side connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u32);

impl ClientId {
    /// The lowest identity, handed out first.
    pub const FIRST: Self = Self(0);

    /// Creates a client ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the identity immediately above this one, or `None` at
    /// `u32::MAX`.
    #[inline]
    #[must_use]
    pub(crate) const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClientId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ClientId> for u32 {
    #[inline]
    fn from(id: ClientId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId::new(3).to_string(), "3");
        assert_eq!(ClientId::FIRST.to_string(), "0");
    }

    #[test]
    fn test_client_id_ordering() {
        assert!(ClientId::new(1) < ClientId::new(2));
        assert_eq!(ClientId::FIRST.next(), Some(ClientId::new(1)));
    }

    #[test]
    fn test_client_id_next_at_max() {
        assert_eq!(ClientId::new(u32::MAX).next(), None);
    }

    #[test]
    fn test_client_id_serde_transparent() {
        let json = serde_json::to_string(&ClientId::new(5)).unwrap();
        assert_eq!(json, "5");
        let id: ClientId = serde_json::from_str("9").unwrap();
        assert_eq!(id.as_u32(), 9);
    }
}
