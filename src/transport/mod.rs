//! HTTP/2 transport layer.
//!
//! This module provides the capability the connection consumes: open a
//! client bound to a host, port, and certificate set; perform POST;
//! perform PING. The frame-level transport itself stays behind the
//! [`PushTransport`] trait so the connection logic can be exercised
//! against a test double.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                       ┌─────────────────┐
//! │  ApnsConnection  │        HTTP/2         │  Push Gateway   │
//! │                  │  POST /3/device/{tok} │                 │
//! │  PushTransport ──┼──────────────────────►│  (APNs HTTP/2   │
//! │  (H2Transport)   │◄───────  PING  ──────►│   endpoint)     │
//! └──────────────────┘      TLS + ALPN h2    └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `certs` | Client identity and certificate-set assembly |
//! | `h2` | Real HTTP/2 client over rustls |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use http::{HeaderMap, Request, StatusCode};

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Client identity and certificate-set assembly.
pub mod certs;

/// HTTP/2 client transport over rustls.
pub mod h2;

// ============================================================================
// Re-exports
// ============================================================================

pub use certs::{CertificateSet, ClientIdentity};
pub use self::h2::H2Transport;

// ============================================================================
// Constants
// ============================================================================

/// Fixed 8-byte payload carried by keep-alive PING frames.
pub const PING_PAYLOAD: [u8; 8] = *b"PINGPONG";

// ============================================================================
// TransportResponse
// ============================================================================

/// Raw response returned by a transport POST.
///
/// The connection interprets this into a typed outcome; the transport
/// only collects status, headers, and body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: StatusCode,

    /// Response headers.
    pub headers: HeaderMap,

    /// Complete response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns a header value as a string, if present and valid UTF-8.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

// ============================================================================
// PushTransport
// ============================================================================

/// Transport capability consumed by the connection.
///
/// One transport instance is bound to one gateway endpoint and one
/// certificate set for its whole lifetime. Implementations must be safe
/// to share between the sending path and the keep-alive prober; the
/// connection additionally serializes both through its own guard.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Performs a POST and collects the complete response.
    ///
    /// # Errors
    ///
    /// Transport-level failures (connection, TLS, HTTP/2) propagate
    /// as-is; they are never mapped into delivery outcomes.
    async fn post(&self, request: Request<Vec<u8>>) -> Result<TransportResponse>;

    /// Performs a protocol-level liveness probe.
    ///
    /// Returns `true` when the peer acknowledged the probe. The caller
    /// owns the deadline.
    async fn ping(&self, payload: [u8; 8]) -> Result<bool>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_payload() {
        assert_eq!(&PING_PAYLOAD, b"PINGPONG");
        assert_eq!(PING_PAYLOAD.len(), 8);
    }

    #[test]
    fn test_transport_response_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("apns-id", "abc".parse().expect("header value"));

        let response = TransportResponse {
            status: StatusCode::OK,
            headers,
            body: Vec::new(),
        };

        assert_eq!(response.header("apns-id"), Some("abc"));
        assert_eq!(response.header("missing"), None);
    }
}
