//! Gateway protocol types.
//!
//! This module defines the request-side notification model and the
//! response-side interpretation of gateway replies.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`Notification`] | Local → Gateway | One push request (token, payload, headers) |
//! | [`ErrorBody`] | Gateway → Local | JSON failure body (`reason`, `timestamp`) |
//! | [`FailureReason`] | Gateway → Local | Closed set of documented rejection reasons |
//!
//! # Wire Shape
//!
//! A notification is posted as
//! `POST https://{host}:{port}/3/device/{deviceToken}` with the payload
//! bytes as body and the `apns-id`, `apns-expiration`, `apns-priority`,
//! `content-length`, and `apns-topic` headers. A failure response
//! carries an optional JSON body:
//!
//! ```json
//! { "reason": "BadDeviceToken", "timestamp": 1420000000 }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Notification model and request header construction.
pub mod notification;

/// Gateway response interpretation and failure taxonomy.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use notification::{Notification, Priority};
pub use response::{ErrorBody, FailureReason};
