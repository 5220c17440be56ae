//! Notification model and request header construction.
//!
//! A [`Notification`] is transient: the caller creates one per send and
//! the connection consumes it within a single `send` call. The
//! correlation id is generated up front so the gateway's echo can be
//! checked against it.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::ApnsId;

// ============================================================================
// Priority
// ============================================================================

/// Delivery priority requested from the gateway.
///
/// Maps to the `apns-priority` header: Low sends "5" (power-friendly,
/// may be coalesced), High sends "10" (immediate delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Deliver at a time that conserves device power.
    Low,
    /// Deliver immediately.
    High,
}

impl Priority {
    /// Returns the wire value for the `apns-priority` header.
    #[inline]
    #[must_use]
    pub const fn header_value(&self) -> &'static str {
        match self {
            Self::Low => "5",
            Self::High => "10",
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// One push notification addressed to a single device.
///
/// # Example
///
/// ```
/// use apns_http2::{Notification, Priority};
///
/// let notification = Notification::new(
///     "740f4707bebcf74f9b7c25d48e3358945f6aa01da5ddb387462c7eaf61bb78ad",
///     serde_json::json!({"aps": {"alert": "Hello"}}),
/// )
/// .with_priority(Priority::High)
/// .with_topic("com.example.app");
/// ```
#[derive(Debug, Clone)]
pub struct Notification {
    /// Target device token.
    device_token: String,

    /// Opaque JSON payload posted as the request body.
    payload: Value,

    /// Correlation id sent in the `apns-id` header.
    apns_id: ApnsId,

    /// Absolute expiration instant, if the notification should expire.
    expiration: Option<SystemTime>,

    /// Requested delivery priority.
    priority: Option<Priority>,

    /// Topic (application bundle id) the notification belongs to.
    topic: Option<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Notification {
    /// Creates a notification with a freshly generated correlation id.
    #[inline]
    #[must_use]
    pub fn new(device_token: impl Into<String>, payload: Value) -> Self {
        Self {
            device_token: device_token.into(),
            payload,
            apns_id: ApnsId::generate(),
            expiration: None,
            priority: None,
            topic: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Notification {
    /// Replaces the generated correlation id with a caller-supplied one.
    #[inline]
    #[must_use]
    pub fn with_apns_id(mut self, apns_id: ApnsId) -> Self {
        self.apns_id = apns_id;
        self
    }

    /// Sets the absolute expiration instant.
    ///
    /// Passed through unchanged even when already in the past; the
    /// gateway decides what to do with it.
    #[inline]
    #[must_use]
    pub fn with_expiration(mut self, expiration: SystemTime) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the delivery priority.
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the topic.
    #[inline]
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Notification {
    /// Returns the target device token.
    #[inline]
    #[must_use]
    pub fn device_token(&self) -> &str {
        &self.device_token
    }

    /// Returns the correlation id.
    #[inline]
    #[must_use]
    pub const fn apns_id(&self) -> ApnsId {
        self.apns_id
    }

    /// Returns the payload.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the expiration instant, if set.
    #[inline]
    #[must_use]
    pub const fn expiration(&self) -> Option<SystemTime> {
        self.expiration
    }

    /// Returns the priority, if set.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Returns the topic, if set.
    #[inline]
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

// ============================================================================
// Wire Construction
// ============================================================================

impl Notification {
    /// Serializes the payload to the UTF-8 bytes posted as the body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload cannot be
    /// serialized.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }

    /// Returns the expiration as whole seconds since the Unix epoch.
    ///
    /// Instants before the epoch map to negative seconds; no validation
    /// is applied on the client side.
    #[must_use]
    pub fn expiration_epoch_seconds(&self) -> Option<i64> {
        self.expiration.map(|at| match at.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        })
    }

    /// Builds the request headers for a body of `content_length` bytes.
    ///
    /// Returned in wire order: `apns-id`, `apns-expiration` (when an
    /// expiration is set), `apns-priority` (when a priority is set),
    /// `content-length`, `apns-topic` (when a non-empty topic is set).
    #[must_use]
    pub fn header_pairs(&self, content_length: usize) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(5);

        headers.push(("apns-id", self.apns_id.header_value()));

        if let Some(seconds) = self.expiration_epoch_seconds() {
            headers.push(("apns-expiration", seconds.to_string()));
        }

        if let Some(priority) = self.priority {
            headers.push(("apns-priority", priority.header_value().to_string()));
        }

        headers.push(("content-length", content_length.to_string()));

        if let Some(topic) = self.topic.as_deref()
            && !topic.is_empty()
        {
            headers.push(("apns-topic", topic.to_string()));
        }

        headers
    }
}

// ============================================================================
// Tests
// ============================================================================
