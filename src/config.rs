//! Connection configuration.
//!
//! Provides a type-safe interface for configuring the gateway endpoint,
//! client-authentication material, and keep-alive behavior.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use apns_http2::ApnsConfig;
//!
//! let config = ApnsConfig::production()
//!     .with_client_identity(identity)
//!     .with_os_certificate_stores()
//!     .with_keep_alive(Duration::from_secs(60));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustls::pki_types::CertificateDer;

use crate::error::{Error, Result};
use crate::transport::ClientIdentity;

// ============================================================================
// Constants
// ============================================================================

/// Production gateway host.
pub const PRODUCTION_HOST: &str = "api.push.apple.com";

/// Sandbox gateway host.
pub const SANDBOX_HOST: &str = "api.sandbox.push.apple.com";

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 443;

// ============================================================================
// ApnsConfig
// ============================================================================

/// Configuration for one gateway connection.
///
/// Supplied once at connection construction and immutable afterwards,
/// except for the keep-alive controls which the connection exposes
/// through a runtime handle.
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// Gateway host name.
    pub host: String,

    /// Gateway port.
    pub port: u16,

    /// Client certificate chain and private key for TLS authentication.
    pub client_identity: Option<ClientIdentity>,

    /// Include certificates from the OS trust stores in the
    /// certificate set passed to transport initialization.
    pub use_os_certificate_stores: bool,

    /// Additional certificates appended to the certificate set.
    pub additional_certificates: Vec<CertificateDer<'static>>,

    /// Interval between keep-alive probes, if probing is wanted.
    pub keep_alive_period: Option<Duration>,

    /// Whether the connection should keep probing once started.
    pub try_keep_alive: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl ApnsConfig {
    /// Creates a configuration for an arbitrary host and port.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_identity: None,
            use_os_certificate_stores: false,
            additional_certificates: Vec::new(),
            keep_alive_period: None,
            try_keep_alive: true,
        }
    }

    /// Creates a configuration for the production gateway.
    #[inline]
    #[must_use]
    pub fn production() -> Self {
        Self::new(PRODUCTION_HOST, DEFAULT_PORT)
    }

    /// Creates a configuration for the sandbox gateway.
    #[inline]
    #[must_use]
    pub fn sandbox() -> Self {
        Self::new(SANDBOX_HOST, DEFAULT_PORT)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ApnsConfig {
    /// Sets the client certificate chain and key used for TLS
    /// authentication.
    #[inline]
    #[must_use]
    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Includes the OS trust stores in the assembled certificate set.
    ///
    /// A failure reading the stores is fatal to connection construction.
    #[inline]
    #[must_use]
    pub fn with_os_certificate_stores(mut self) -> Self {
        self.use_os_certificate_stores = true;
        self
    }

    /// Appends an additional certificate to the certificate set.
    #[inline]
    #[must_use]
    pub fn with_additional_certificate(mut self, cert: CertificateDer<'static>) -> Self {
        self.additional_certificates.push(cert);
        self
    }

    /// Appends multiple additional certificates to the certificate set.
    #[inline]
    #[must_use]
    pub fn with_additional_certificates(
        mut self,
        certs: impl IntoIterator<Item = CertificateDer<'static>>,
    ) -> Self {
        self.additional_certificates.extend(certs);
        self
    }

    /// Enables keep-alive probing at the given period.
    #[inline]
    #[must_use]
    pub fn with_keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive_period = Some(period);
        self
    }

    /// Disables keep-alive probing regardless of the configured period.
    #[inline]
    #[must_use]
    pub fn without_keep_alive(mut self) -> Self {
        self.try_keep_alive = false;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ApnsConfig {
    /// Returns `true` if a prober should be started for this
    /// configuration.
    #[inline]
    #[must_use]
    pub const fn keep_alive_enabled(&self) -> bool {
        self.try_keep_alive && self.keep_alive_period.is_some()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the host is empty, the port is
    /// zero, or a keep-alive period of zero is configured.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("port must be non-zero"));
        }
        if let Some(period) = self.keep_alive_period
            && period.is_zero()
        {
            return Err(Error::config("keep-alive period must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_preset() {
        let config = ApnsConfig::production();
        assert_eq!(config.host, "api.push.apple.com");
        assert_eq!(config.port, 443);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sandbox_preset() {
        let config = ApnsConfig::sandbox();
        assert_eq!(config.host, "api.sandbox.push.apple.com");
        assert_eq!(config.port, 443);
    }

    #[test]
    fn test_builder_chain() {
        let config = ApnsConfig::new("gateway.example.com", 2197)
            .with_os_certificate_stores()
            .with_keep_alive(Duration::from_secs(30));

        assert_eq!(config.host, "gateway.example.com");
        assert_eq!(config.port, 2197);
        assert!(config.use_os_certificate_stores);
        assert_eq!(config.keep_alive_period, Some(Duration::from_secs(30)));
        assert!(config.keep_alive_enabled());
    }

    #[test]
    fn test_keep_alive_disabled_without_period() {
        let config = ApnsConfig::production();
        assert!(config.try_keep_alive);
        assert!(!config.keep_alive_enabled());
    }

    #[test]
    fn test_without_keep_alive_overrides_period() {
        let config = ApnsConfig::production()
            .with_keep_alive(Duration::from_secs(30))
            .without_keep_alive();
        assert!(!config.keep_alive_enabled());
    }

    #[test]
    fn test_validate_empty_host() {
        let config = ApnsConfig::new("", 443);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_port() {
        let config = ApnsConfig::new("api.push.apple.com", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_keep_alive_period() {
        let config = ApnsConfig::production().with_keep_alive(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_additional_certificates_appended_in_order() {
        let a = CertificateDer::from(vec![1u8, 2, 3]);
        let b = CertificateDer::from(vec![4u8, 5, 6]);
        let config = ApnsConfig::production().with_additional_certificates([a.clone(), b.clone()]);

        assert_eq!(config.additional_certificates, vec![a, b]);
    }
}
