//! Service connection adapter.
//!
//! The seam an external broker consumes: a factory that opens
//! connection-like values and a `send` contract per notification. The
//! broker itself (fan-out, retries, backoff) lives outside this crate.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::config::ApnsConfig;
use crate::connection::ApnsConnection;
use crate::error::Result;
use crate::protocol::Notification;

// ============================================================================
// ServiceConnection
// ============================================================================

/// One logical delivery connection as seen by a broker.
#[async_trait]
pub trait ServiceConnection: Send + Sync {
    /// Delivers one notification, returning the typed outcome.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

#[async_trait]
impl ServiceConnection for ApnsConnection {
    async fn send(&self, notification: &Notification) -> Result<()> {
        ApnsConnection::send(self, notification).await
    }
}

// ============================================================================
// ServiceConnectionFactory
// ============================================================================

/// Opens delivery connections for a broker.
#[async_trait]
pub trait ServiceConnectionFactory: Send + Sync {
    /// Connection type produced by this factory.
    type Connection: ServiceConnection;

    /// Opens a new connection.
    async fn create(&self) -> Result<Self::Connection>;
}

// ============================================================================
// ApnsServiceConnectionFactory
// ============================================================================

/// Factory producing gateway connections from one configuration.
#[derive(Debug, Clone)]
pub struct ApnsServiceConnectionFactory {
    config: ApnsConfig,
}

impl ApnsServiceConnectionFactory {
    /// Creates a factory for the given configuration.
    #[inline]
    #[must_use]
    pub fn new(config: ApnsConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration connections are opened with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ApnsConfig {
        &self.config
    }
}

#[async_trait]
impl ServiceConnectionFactory for ApnsServiceConnectionFactory {
    type Connection = ApnsConnection;

    async fn create(&self) -> Result<ApnsConnection> {
        ApnsConnection::connect(self.config.clone()).await
    }
}

// ============================================================================
// Tests
// ============================================================================
