//! HTTP/2 client transport over rustls.
//!
//! Opens one TLS connection (ALPN `h2`) to the gateway and keeps it for
//! the transport's lifetime. The HTTP/2 connection driver runs on a
//! background task; request handles and the ping handle stay here.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use ::h2::client::{self, SendRequest};
use ::h2::{Ping, PingPong};
use bytes::Bytes;
use http::Request;
use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::certs::{CertificateSet, ClientIdentity};
use crate::transport::{PushTransport, TransportResponse};

// ============================================================================
// H2Transport
// ============================================================================

/// HTTP/2 client bound to one host, port, and certificate set.
///
/// Cheap request handles are cloned per POST; the ping handle is
/// exclusive to one probe at a time.
pub struct H2Transport {
    /// Handle for opening request streams.
    send_request: parking_lot::Mutex<SendRequest<Bytes>>,

    /// Handle for user-initiated PING frames.
    ping: tokio::sync::Mutex<PingPong>,
}

impl H2Transport {
    /// Opens a TLS connection to `host:port` and performs the HTTP/2
    /// handshake.
    ///
    /// The certificate set seeds peer verification; the identity, when
    /// present, authenticates this client.
    ///
    /// # Errors
    ///
    /// - [`Error::Tls`] if the TLS configuration is rejected
    /// - [`Error::Connection`] if the host name is invalid
    /// - [`Error::Io`] / [`Error::Http2`] on connect or handshake
    ///   failure
    pub async fn connect(
        host: &str,
        port: u16,
        certificates: &CertificateSet,
        identity: Option<&ClientIdentity>,
    ) -> Result<Self> {
        let tls_config = Self::tls_config(certificates, identity)?;
        let connector = TlsConnector::from(Arc::new(tls_config));

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| Error::connection(format!("invalid host name {host:?}: {e}")))?;

        let tcp = TcpStream::connect((host, port)).await?;
        let tls = connector.connect(server_name, tcp).await?;

        let (send_request, mut connection) = client::handshake(tls).await?;

        let ping = connection
            .ping_pong()
            .ok_or_else(|| Error::connection("HTTP/2 ping handle unavailable"))?;

        // Drive the connection until it ends; request futures complete
        // through their own handles.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "HTTP/2 connection terminated");
            } else {
                debug!("HTTP/2 connection closed");
            }
        });

        debug!(host, port, "HTTP/2 transport established");

        Ok(Self {
            send_request: parking_lot::Mutex::new(send_request),
            ping: tokio::sync::Mutex::new(ping),
        })
    }

    /// Builds the rustls client configuration for the certificate set.
    fn tls_config(
        certificates: &CertificateSet,
        identity: Option<&ClientIdentity>,
    ) -> Result<ClientConfig> {
        let roots = certificates.root_store();
        let builder = ClientConfig::builder().with_root_certificates(roots);

        let mut config = match identity {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain().to_vec(), identity.key().clone_key())?,
            None => builder.with_no_client_auth(),
        };

        config.alpn_protocols = vec![b"h2".to_vec()];
        Ok(config)
    }
}

// ============================================================================
// PushTransport Implementation
// ============================================================================

#[async_trait::async_trait]
impl PushTransport for H2Transport {
    async fn post(&self, request: Request<Vec<u8>>) -> Result<TransportResponse> {
        let (parts, body) = request.into_parts();
        let request = Request::from_parts(parts, ());

        let handle = self.send_request.lock().clone();
        let mut handle = handle.ready().await?;

        let (response, mut stream) = handle.send_request(request, false)?;
        stream.send_data(Bytes::from(body), true)?;

        let response = response.await?;
        let (parts, mut incoming) = response.into_parts();

        let mut body = Vec::new();
        while let Some(chunk) = incoming.data().await {
            let chunk = chunk?;
            let _ = incoming.flow_control().release_capacity(chunk.len());
            body.extend_from_slice(&chunk);
        }

        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    async fn ping(&self, _payload: [u8; 8]) -> Result<bool> {
        // The h2 layer owns the opaque frame payload; the fixed probe
        // payload stays part of the trait contract for transports that
        // can carry it.
        let mut ping = self.ping.lock().await;
        ping.ping(Ping::opaque()).await?;
        Ok(true)
    }
}
