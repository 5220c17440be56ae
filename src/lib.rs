//! APNs HTTP/2 client - persistent push-delivery connection library.
//!
//! This library models one TLS-authenticated HTTP/2 connection to
//! Apple's push notification gateway: it assembles client certificates,
//! serializes notifications over a single shared transport, interprets
//! gateway responses into typed outcomes, and keeps the connection
//! alive with periodic PING probes.
//!
//! # Architecture
//!
//! - Each [`ApnsConnection`] owns: one HTTP/2 transport + a keep-alive
//!   prober task
//! - All sends on a connection serialize through one guard; only one
//!   POST is in flight at a time
//! - Gateway failures surface as typed errors carrying the originating
//!   [`Notification`]
//! - The broker-facing seam is [`ServiceConnectionFactory`] /
//!   [`ServiceConnection`]; pooling and retry policy live outside this
//!   crate
//!
//! # Quick Start
//!
//! ```ignore
//! use apns_http2::{ApnsConfig, ApnsConnection, ClientIdentity, Notification, Priority, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let identity = ClientIdentity::from_pem_files("push-cert.pem", "push-key.pem")?;
//!
//!     let config = ApnsConfig::production()
//!         .with_client_identity(identity)
//!         .with_os_certificate_stores()
//!         .with_keep_alive(std::time::Duration::from_secs(60));
//!
//!     let connection = ApnsConnection::connect(config).await?;
//!
//!     let notification = Notification::new(
//!         "740f4707bebcf74f9b7c25d48e3358945f6aa01da5ddb387462c7eaf61bb78ad",
//!         serde_json::json!({"aps": {"alert": "Hello"}}),
//!     )
//!     .with_priority(Priority::High)
//!     .with_topic("com.example.app");
//!
//!     connection.send(&notification).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Gateway endpoint and certificate configuration |
//! | [`connection`] | Connection, send path, keep-alive prober |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe id wrappers |
//! | [`protocol`] | Notification model and response interpretation |
//! | [`service`] | Broker-facing connection factory seam |
//! | [`transport`] | HTTP/2 transport and certificate assembly |

// ============================================================================
// Modules
// ============================================================================

/// Gateway endpoint and certificate configuration.
///
/// Use [`ApnsConfig::production()`] or [`ApnsConfig::sandbox()`] as a
/// starting point.
pub mod config;

/// Connection, send path, and keep-alive prober.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible ids at compile time.
pub mod identifiers;

/// Notification model and gateway response interpretation.
pub mod protocol;

/// Broker-facing connection factory seam.
pub mod service;

/// HTTP/2 transport layer and certificate assembly.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::ApnsConfig;

// Connection types
pub use connection::{ApnsConnection, KeepAliveHandle};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ApnsId, ConnectionId};

// Protocol types
pub use protocol::{ErrorBody, FailureReason, Notification, Priority};

// Service types
pub use service::{ApnsServiceConnectionFactory, ServiceConnection, ServiceConnectionFactory};

// Transport types
pub use transport::{CertificateSet, ClientIdentity, H2Transport, PushTransport, TransportResponse};
