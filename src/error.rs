//! Error types for the APNs HTTP/2 client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use apns_http2::{Result, Error};
//!
//! async fn example(connection: &ApnsConnection) -> Result<()> {
//!     connection.send(&notification).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Certificate`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::Io`], [`Error::Tls`], [`Error::Http2`] |
//! | Protocol integrity | [`Error::MismatchedApnsId`] |
//! | Delivery | [`Error::SubscriptionExpired`], [`Error::NotificationRejected`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Json`], [`Error::Http`], [`Error::Url`] |
//!
//! The delivery variants retain the originating [`Notification`] so a
//! caller can correlate a failure back to the device it was sent to,
//! e.g. to drop a dead token from a registry.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::SystemTime;

use thiserror::Error;

use crate::identifiers::ApnsId;
use crate::protocol::{FailureReason, Notification};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Certificate loading or assembly error.
    ///
    /// Returned when client-authentication material cannot be read,
    /// including failures querying the OS certificate stores. These are
    /// fatal to connection construction.
    #[error("Certificate error: {message}")]
    Certificate {
        /// Description of the certificate error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport connection failed.
    ///
    /// Returned when the TLS/HTTP/2 connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport connection closed unexpectedly.
    ///
    /// Returned when the connection is lost during operation.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Integrity Errors
    // ========================================================================
    /// The gateway echoed a different `apns-id` than the one sent.
    ///
    /// Treated as a defect in transit, distinct from a delivery
    /// rejection: the request was accepted but the response cannot be
    /// trusted to belong to it.
    #[error("Mismatched apns-id: sent {expected}, received {received:?}")]
    MismatchedApnsId {
        /// Correlation id sent with the request.
        expected: ApnsId,
        /// Raw `apns-id` header value received, if any.
        received: Option<String>,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// The device subscription is no longer valid (HTTP 410).
    ///
    /// The caller should stop sending to the old token.
    #[error("Subscription expired for token {old_token} at {expired_at:?}")]
    SubscriptionExpired {
        /// The notification that hit the expired subscription.
        notification: Box<Notification>,
        /// The device token that is no longer valid.
        old_token: String,
        /// Replacement token, when the gateway supplies one.
        new_token: Option<String>,
        /// Instant the subscription expired.
        expired_at: SystemTime,
    },

    /// The gateway rejected the notification with a named reason.
    #[error("Notification rejected: {reason}")]
    NotificationRejected {
        /// Gateway-reported failure reason.
        reason: FailureReason,
        /// The rejected notification.
        notification: Box<Notification>,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when an operation exceeds its deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// HTTP/2 protocol error.
    #[error("HTTP/2 error: {0}")]
    Http2(#[from] h2::Error),

    /// HTTP request construction error.
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a certificate error.
    #[inline]
    pub fn certificate(message: impl Into<String>) -> Self {
        Self::Certificate {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a mismatched `apns-id` error.
    #[inline]
    pub fn mismatched_apns_id(expected: ApnsId, received: Option<String>) -> Self {
        Self::MismatchedApnsId { expected, received }
    }

    /// Creates a subscription expired error.
    ///
    /// The old token is taken from the notification's device token.
    #[inline]
    pub fn subscription_expired(
        notification: Notification,
        new_token: Option<String>,
        expired_at: SystemTime,
    ) -> Self {
        Self::SubscriptionExpired {
            old_token: notification.device_token().to_string(),
            notification: Box::new(notification),
            new_token,
            expired_at,
        }
    }

    /// Creates a notification rejected error.
    #[inline]
    pub fn rejected(reason: FailureReason, notification: Notification) -> Self {
        Self::NotificationRejected {
            reason,
            notification: Box::new(notification),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport-fatal error.
    ///
    /// Transport-fatal errors are not recoverable on this connection.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
                | Self::Tls(_)
                | Self::Http2(_)
        )
    }

    /// Returns `true` if the gateway rejected the notification.
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotificationRejected { .. })
    }

    /// Returns `true` if the device subscription expired.
    #[inline]
    #[must_use]
    pub fn is_subscription_expired(&self) -> bool {
        matches!(self, Self::SubscriptionExpired { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the originating notification for delivery failures.
    ///
    /// `None` for every other category.
    #[inline]
    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            Self::SubscriptionExpired { notification, .. }
            | Self::NotificationRejected { notification, .. } => Some(notification),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
