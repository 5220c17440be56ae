//! Gateway response interpretation and failure taxonomy.
//!
//! Converts a raw status code, header set, and body into either a
//! success signal or one of the typed failures in
//! [`crate::Error`]. The body schema is parsed once into [`ErrorBody`];
//! reason strings map through an explicit table into [`FailureReason`]
//! with a defined fallback, so an unrecognized reason can never crash
//! the pipeline.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::Notification;
use crate::transport::TransportResponse;

// ============================================================================
// ErrorBody
// ============================================================================

/// JSON body attached to a failure response.
///
/// # Format
///
/// ```json
/// { "reason": "Unregistered", "timestamp": 1420000000 }
/// ```
///
/// Both fields are optional; `timestamp` is epoch seconds and only
/// meaningful with status 410. An absent body is equivalent to `{}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Documented failure reason string.
    #[serde(default)]
    pub reason: Option<String>,

    /// Subscription expiry instant as epoch seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl ErrorBody {
    /// Parses a response body, treating an empty body as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when a non-empty body is not valid JSON.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// Returns the expiry instant encoded in `timestamp`.
    ///
    /// Falls back to `now` when the field is absent.
    #[must_use]
    pub fn expired_at(&self) -> SystemTime {
        match self.timestamp {
            Some(seconds) if seconds >= 0 => UNIX_EPOCH + Duration::from_secs(seconds as u64),
            Some(seconds) => UNIX_EPOCH - Duration::from_secs(seconds.unsigned_abs()),
            None => SystemTime::now(),
        }
    }
}

// ============================================================================
// FailureReason
// ============================================================================

/// Documented gateway rejection reasons.
///
/// Mirrors the reason strings the gateway returns in failure bodies.
/// Strings outside the documented set map to [`FailureReason::Unknown`]
/// rather than failing interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The message payload was empty.
    PayloadEmpty,
    /// The message payload was too large.
    PayloadTooLarge,
    /// The `apns-topic` was invalid.
    BadTopic,
    /// Pushing to this topic is not allowed.
    TopicDisallowed,
    /// The `apns-id` value was bad.
    BadMessageId,
    /// The `apns-expiration` value was bad.
    BadExpirationDate,
    /// The `apns-priority` value was bad.
    BadPriority,
    /// The device token is not specified in the request path.
    MissingDeviceToken,
    /// The specified device token was bad.
    BadDeviceToken,
    /// The device token does not match the specified topic.
    DeviceTokenNotForTopic,
    /// The device token is inactive for the specified topic.
    Unregistered,
    /// One or more headers were repeated.
    DuplicateHeaders,
    /// The client certificate was for the wrong environment.
    BadCertificateEnvironment,
    /// The certificate was bad.
    BadCertificate,
    /// The specified action is not allowed.
    Forbidden,
    /// The request contained a bad `:path` value.
    BadPath,
    /// The specified `:method` was not POST.
    MethodNotAllowed,
    /// Too many requests were made consecutively to the same token.
    TooManyRequests,
    /// Idle timeout.
    IdleTimeout,
    /// The server is shutting down.
    Shutdown,
    /// An internal server error occurred.
    InternalServerError,
    /// The service is unavailable.
    ServiceUnavailable,
    /// The `apns-topic` header was missing.
    MissingTopic,
    /// Reason string outside the documented set.
    Unknown,
}

impl FailureReason {
    /// Maps a gateway reason string to the closed enumeration.
    ///
    /// Matching is case-insensitive; anything unrecognized maps to
    /// [`FailureReason::Unknown`].
    #[must_use]
    pub fn from_reason(reason: &str) -> Self {
        match reason.to_ascii_lowercase().as_str() {
            "payloadempty" => Self::PayloadEmpty,
            "payloadtoolarge" => Self::PayloadTooLarge,
            "badtopic" => Self::BadTopic,
            "topicdisallowed" => Self::TopicDisallowed,
            "badmessageid" => Self::BadMessageId,
            "badexpirationdate" => Self::BadExpirationDate,
            "badpriority" => Self::BadPriority,
            "missingdevicetoken" => Self::MissingDeviceToken,
            "baddevicetoken" => Self::BadDeviceToken,
            "devicetokennotfortopic" => Self::DeviceTokenNotForTopic,
            "unregistered" => Self::Unregistered,
            "duplicateheaders" => Self::DuplicateHeaders,
            "badcertificateenvironment" => Self::BadCertificateEnvironment,
            "badcertificate" => Self::BadCertificate,
            "forbidden" => Self::Forbidden,
            "badpath" => Self::BadPath,
            "methodnotallowed" => Self::MethodNotAllowed,
            "toomanyrequests" => Self::TooManyRequests,
            "idletimeout" => Self::IdleTimeout,
            "shutdown" => Self::Shutdown,
            "internalservererror" => Self::InternalServerError,
            "serviceunavailable" => Self::ServiceUnavailable,
            "missingtopic" => Self::MissingTopic,
            _ => Self::Unknown,
        }
    }

    /// Returns the documented reason string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PayloadEmpty => "PayloadEmpty",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::BadTopic => "BadTopic",
            Self::TopicDisallowed => "TopicDisallowed",
            Self::BadMessageId => "BadMessageId",
            Self::BadExpirationDate => "BadExpirationDate",
            Self::BadPriority => "BadPriority",
            Self::MissingDeviceToken => "MissingDeviceToken",
            Self::BadDeviceToken => "BadDeviceToken",
            Self::DeviceTokenNotForTopic => "DeviceTokenNotForTopic",
            Self::Unregistered => "Unregistered",
            Self::DuplicateHeaders => "DuplicateHeaders",
            Self::BadCertificateEnvironment => "BadCertificateEnvironment",
            Self::BadCertificate => "BadCertificate",
            Self::Forbidden => "Forbidden",
            Self::BadPath => "BadPath",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::TooManyRequests => "TooManyRequests",
            Self::IdleTimeout => "IdleTimeout",
            Self::Shutdown => "Shutdown",
            Self::InternalServerError => "InternalServerError",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::MissingTopic => "MissingTopic",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Interpretation
// ============================================================================

/// Interprets a gateway response for the given notification.
///
/// - HTTP 200 with a matching `apns-id` echo is a success; any other
///   echo is a protocol-integrity failure.
/// - HTTP 410 becomes [`Error::SubscriptionExpired`] with the expiry
///   instant from the body's `timestamp`, defaulting to now.
/// - Every other status becomes [`Error::NotificationRejected`] with
///   the mapped reason.
///
/// Transport failures never reach this function; they propagate from
/// the transport layer as-is.
pub(crate) fn interpret(notification: &Notification, response: &TransportResponse) -> Result<()> {
    if response.status == StatusCode::OK {
        let received = response.header("apns-id");
        return match received {
            Some(value) if notification.apns_id().matches_header(value) => {
                debug!(apns_id = %notification.apns_id(), "notification accepted");
                Ok(())
            }
            other => Err(Error::mismatched_apns_id(
                notification.apns_id(),
                other.map(str::to_string),
            )),
        };
    }

    let body = ErrorBody::parse(&response.body)?;

    if response.status == StatusCode::GONE {
        let expired_at = body.expired_at();
        warn!(
            token = notification.device_token(),
            ?expired_at,
            "device subscription expired"
        );
        return Err(Error::subscription_expired(
            notification.clone(),
            None,
            expired_at,
        ));
    }

    let reason = body
        .reason
        .as_deref()
        .map(FailureReason::from_reason)
        .unwrap_or(FailureReason::Unknown);

    warn!(
        status = response.status.as_u16(),
        %reason,
        apns_id = %notification.apns_id(),
        "notification rejected"
    );

    Err(Error::rejected(reason, notification.clone()))
}

// ============================================================================
// Tests
// ============================================================================
