//! Type-safe identifiers for connections and notifications.
//!
//! Newtype wrappers prevent mixing incompatible identifiers at compile
//! time and centralize how they are generated:
//!
//! - [`ApnsId`] - correlation id carried in the `apns-id` header
//! - [`ConnectionId`] - process-wide connection counter

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ApnsId
// ============================================================================

/// Correlation id for a single notification.
///
/// Sent in the `apns-id` request header; the gateway echoes it back on
/// success. The value must round-trip through the protocol unchanged, so
/// the canonical hyphenated UUID form is used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApnsId(Uuid);

impl ApnsId {
    /// Generates a new random correlation id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the wire representation sent in the `apns-id` header.
    #[inline]
    #[must_use]
    pub fn header_value(&self) -> String {
        self.0.to_string()
    }

    /// Compares against a raw header value echoed by the gateway.
    ///
    /// The comparison is exact; any textual difference counts as a
    /// mismatch.
    #[inline]
    #[must_use]
    pub fn matches_header(&self, value: &str) -> bool {
        self.header_value() == value
    }
}

impl fmt::Display for ApnsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApnsId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Process-wide connection counter.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a single connection within this process.
///
/// Assigned from a monotonically increasing atomic counter that never
/// resets, so ids stay unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next connection id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
