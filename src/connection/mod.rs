//! Gateway connection and send path.
//!
//! One [`ApnsConnection`] owns one transport handle bound to a fixed
//! host, port, and certificate set. Callers invoke [`send`] per
//! notification; the connection builds the request, serializes it
//! through the shared transport under mutual exclusion, and interprets
//! the response. A keep-alive prober runs on its own task for the
//! lifetime of the connection.
//!
//! [`send`]: ApnsConnection::send
//!
//! # Concurrency
//!
//! All POSTs on one connection are serialized through a single async
//! mutex; concurrent callers queue in lock-acquisition order. The
//! prober's PING takes the same mutex, so probe and send frames never
//! interleave on the shared transport. `send` itself carries no
//! deadline; callers needing bounded latency wrap it in their own
//! timeout.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use http::{Method, Request};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::config::ApnsConfig;
use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::{Notification, response};
use crate::transport::{CertificateSet, H2Transport, PushTransport};

// ============================================================================
// Submodules
// ============================================================================

/// Keep-alive prober task and runtime handle.
pub mod keepalive;

// ============================================================================
// Re-exports
// ============================================================================

pub use keepalive::KeepAliveHandle;

// ============================================================================
// ApnsConnection
// ============================================================================

/// Persistent connection to the push gateway.
///
/// Created per logical transport and destroyed, along with its prober,
/// on [`shutdown`](Self::shutdown) or drop.
///
/// # Example
///
/// ```ignore
/// use apns_http2::{ApnsConfig, ApnsConnection, Notification};
///
/// let config = ApnsConfig::production().with_client_identity(identity);
/// let connection = ApnsConnection::connect(config).await?;
///
/// let notification = Notification::new(token, payload);
/// connection.send(&notification).await?;
/// ```
pub struct ApnsConnection {
    /// Process-wide connection identity.
    id: ConnectionId,

    /// Configuration supplied at construction.
    config: ApnsConfig,

    /// Shared transport handle.
    transport: Arc<dyn PushTransport>,

    /// Serializes every POST and PING on the transport.
    send_guard: Arc<Mutex<()>>,

    /// Keep-alive controls, when probing is configured.
    keep_alive: Option<KeepAliveHandle>,

    /// Prober task, when probing is configured.
    prober: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// Construction
// ============================================================================

impl ApnsConnection {
    /// Opens a connection to the configured gateway.
    ///
    /// Assembles the certificate set, establishes the TLS/HTTP/2
    /// transport, and starts the keep-alive prober when configured.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Config`] if the configuration is invalid
    /// - [`crate::Error::Certificate`] if certificate assembly fails
    /// - transport errors if the connection cannot be established
    pub async fn connect(config: ApnsConfig) -> Result<Self> {
        config.validate()?;

        let certificates = CertificateSet::assemble(&config)?;
        let transport = H2Transport::connect(
            &config.host,
            config.port,
            &certificates,
            config.client_identity.as_ref(),
        )
        .await?;

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Builds a connection over an already-established transport.
    ///
    /// This is the injection seam for alternative transports and test
    /// doubles; [`connect`](Self::connect) is the production path.
    #[must_use]
    pub fn with_transport(config: ApnsConfig, transport: Arc<dyn PushTransport>) -> Self {
        let id = ConnectionId::next();
        let send_guard = Arc::new(Mutex::new(()));

        let (keep_alive, prober) = if let Some(period) = config.keep_alive_period
            && config.try_keep_alive
        {
            let handle = KeepAliveHandle::new(period);
            let task = keepalive::spawn_prober(
                id,
                Arc::clone(&transport),
                Arc::clone(&send_guard),
                handle.clone(),
            );
            (Some(handle), Some(task))
        } else {
            (None, None)
        };

        info!(%id, host = %config.host, port = config.port, "connection ready");

        Self {
            id,
            config,
            transport,
            send_guard,
            keep_alive,
            prober: parking_lot::Mutex::new(prober),
        }
    }
}

// ============================================================================
// Send Path
// ============================================================================

impl ApnsConnection {
    /// Sends one notification and interprets the gateway response.
    ///
    /// Blocks until the transport completes the request or fails; all
    /// sends on this connection are serialized, so only one POST is in
    /// flight at a time.
    ///
    /// # Errors
    ///
    /// - transport errors propagate as-is
    /// - [`crate::Error::MismatchedApnsId`] when the success echo does
    ///   not match
    /// - [`crate::Error::SubscriptionExpired`] on HTTP 410
    /// - [`crate::Error::NotificationRejected`] on any other failure
    ///   status
    pub async fn send(&self, notification: &Notification) -> Result<()> {
        let url = self.device_url(notification.device_token())?;
        let body = notification.payload_bytes()?;
        let request = Self::build_request(&url, notification, body)?;

        debug!(
            id = %self.id,
            apns_id = %notification.apns_id(),
            token = notification.device_token(),
            "sending notification"
        );

        let raw = {
            let _serialized = self.send_guard.lock().await;
            self.transport.post(request).await?
        };

        response::interpret(notification, &raw)
    }

    /// Builds the target URL for a device token.
    fn device_url(&self, device_token: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "https://{}:{}/3/device/{}",
            self.config.host, self.config.port, device_token
        ))?)
    }

    /// Builds the POST request for a notification.
    fn build_request(
        url: &Url,
        notification: &Notification,
        body: Vec<u8>,
    ) -> Result<Request<Vec<u8>>> {
        let mut builder = Request::builder().method(Method::POST).uri(url.as_str());

        for (name, value) in notification.header_pairs(body.len()) {
            builder = builder.header(name, value);
        }

        Ok(builder.body(body)?)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

impl ApnsConnection {
    /// Returns this connection's identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the configuration supplied at construction.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ApnsConfig {
        &self.config
    }

    /// Returns the keep-alive controls, when probing is configured.
    #[inline]
    #[must_use]
    pub const fn keep_alive(&self) -> Option<&KeepAliveHandle> {
        self.keep_alive.as_ref()
    }

    /// Stops the keep-alive prober and releases the transport.
    ///
    /// The prober is cancelled before the transport handle goes away,
    /// so a probe can never fire into a torn-down connection. Called
    /// automatically on drop.
    pub fn shutdown(&self) {
        if let Some(handle) = &self.keep_alive {
            handle.stop();
        }
        if let Some(task) = self.prober.lock().take() {
            task.abort();
            debug!(id = %self.id, "keep-alive prober cancelled");
        }
    }
}

impl Drop for ApnsConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ApnsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApnsConnection")
            .field("id", &self.id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use http::{HeaderMap, StatusCode};

    use crate::error::Error;
    use crate::protocol::{FailureReason, Priority};
    use crate::transport::TransportResponse;

    /// Recorded POST as seen by the transport.
    struct RecordedRequest {
        uri: String,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    /// Test double transport.
    ///
    /// Replays queued responses; with the queue empty it echoes the
    /// request's `apns-id` back on a 200. Tracks the number of POSTs
    /// simultaneously in flight.
    struct MockTransport {
        responses: parking_lot::Mutex<VecDeque<TransportResponse>>,
        requests: parking_lot::Mutex<Vec<RecordedRequest>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        post_delay: Duration,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: parking_lot::Mutex::new(VecDeque::new()),
                requests: parking_lot::Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                post_delay: Duration::ZERO,
            })
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                responses: parking_lot::Mutex::new(VecDeque::new()),
                requests: parking_lot::Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                post_delay: delay,
            })
        }

        fn queue(&self, status: StatusCode, body: &[u8]) {
            self.responses.lock().push_back(TransportResponse {
                status,
                headers: HeaderMap::new(),
                body: body.to_vec(),
            });
        }
    }

    #[async_trait]
    impl PushTransport for MockTransport {
        async fn post(&self, request: Request<Vec<u8>>) -> crate::Result<TransportResponse> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.post_delay.is_zero() {
                tokio::time::sleep(self.post_delay).await;
            }

            let apns_id = request
                .headers()
                .get("apns-id")
                .cloned()
                .expect("apns-id header always present");

            self.requests.lock().push(RecordedRequest {
                uri: request.uri().to_string(),
                headers: request.headers().clone(),
                body: request.body().clone(),
            });

            let response = self.responses.lock().pop_front().unwrap_or_else(|| {
                let mut headers = HeaderMap::new();
                headers.insert("apns-id", apns_id);
                TransportResponse {
                    status: StatusCode::OK,
                    headers,
                    body: Vec::new(),
                }
            });

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(response)
        }

        async fn ping(&self, _payload: [u8; 8]) -> crate::Result<bool> {
            Ok(true)
        }
    }

    fn connection(transport: Arc<MockTransport>) -> ApnsConnection {
        ApnsConnection::with_transport(ApnsConfig::new("gateway.test", 2197), transport)
    }

    fn notification() -> Notification {
        Notification::new("0123456789abcdef", serde_json::json!({"aps": {"alert": "hi"}}))
    }

    #[tokio::test]
    async fn test_send_success_on_matching_echo() {
        let transport = MockTransport::new();
        let connection = connection(Arc::clone(&transport));

        connection.send(&notification()).await.expect("send succeeds");
    }

    #[tokio::test]
    async fn test_send_builds_device_url() {
        let transport = MockTransport::new();
        let connection = connection(Arc::clone(&transport));

        connection.send(&notification()).await.expect("send");

        let requests = transport.requests.lock();
        assert_eq!(
            requests[0].uri,
            "https://gateway.test:2197/3/device/0123456789abcdef"
        );
    }

    #[tokio::test]
    async fn test_send_builds_headers() {
        let transport = MockTransport::new();
        let connection = connection(Arc::clone(&transport));

        let notification = notification()
            .with_priority(Priority::High)
            .with_topic("com.example.app");
        let expected_id = notification.apns_id().header_value();

        connection.send(&notification).await.expect("send");

        let requests = transport.requests.lock();
        let headers = &requests[0].headers;
        let body = &requests[0].body;

        assert_eq!(headers.get("apns-id").unwrap(), expected_id.as_str());
        assert_eq!(headers.get("apns-priority").unwrap(), "10");
        assert_eq!(headers.get("apns-topic").unwrap(), "com.example.app");
        assert_eq!(
            headers.get("content-length").unwrap(),
            body.len().to_string().as_str()
        );
        assert_eq!(body, &serde_json::to_vec(notification.payload()).unwrap());
    }

    #[tokio::test]
    async fn test_send_mismatched_echo_fails() {
        let transport = MockTransport::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "apns-id",
            "e7c2a9f4-81bb-4c6d-9d3e-0f5a2b7c8d1e".parse().unwrap(),
        );
        transport.responses.lock().push_back(TransportResponse {
            status: StatusCode::OK,
            headers,
            body: Vec::new(),
        });
        let connection = connection(Arc::clone(&transport));

        let err = connection.send(&notification()).await.unwrap_err();
        assert!(matches!(err, Error::MismatchedApnsId { .. }));
    }

    #[tokio::test]
    async fn test_send_maps_rejection() {
        let transport = MockTransport::new();
        transport.queue(StatusCode::BAD_REQUEST, br#"{"reason":"BadDeviceToken"}"#);
        let connection = connection(Arc::clone(&transport));

        let err = connection.send(&notification()).await.unwrap_err();
        match err {
            Error::NotificationRejected { reason, .. } => {
                assert_eq!(reason, FailureReason::BadDeviceToken);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_maps_gone_to_subscription_expired() {
        let transport = MockTransport::new();
        transport.queue(
            StatusCode::GONE,
            br#"{"reason":"Unregistered","timestamp":1420000000}"#,
        );
        let connection = connection(Arc::clone(&transport));

        let err = connection.send(&notification()).await.unwrap_err();
        match err {
            Error::SubscriptionExpired { old_token, .. } => {
                assert_eq!(old_token, "0123456789abcdef");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_sends_never_interleave() {
        let transport = MockTransport::with_delay(Duration::from_millis(5));
        let connection = Arc::new(connection(Arc::clone(&transport)));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let connection = Arc::clone(&connection);
            tasks.push(tokio::spawn(async move {
                connection.send(&notification()).await
            }));
        }
        for task in tasks {
            task.await.expect("join").expect("send");
        }

        assert_eq!(transport.requests.lock().len(), 8);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_prober_without_period() {
        let transport = MockTransport::new();
        let connection = connection(Arc::clone(&transport));

        assert!(connection.keep_alive().is_none());
        assert!(connection.prober.lock().is_none());
    }

    #[tokio::test]
    async fn test_prober_started_with_period() {
        let transport = MockTransport::new();
        let config =
            ApnsConfig::new("gateway.test", 2197).with_keep_alive(Duration::from_secs(60));
        let connection = ApnsConnection::with_transport(config, transport);

        assert!(connection.keep_alive().is_some());
        assert!(connection.prober.lock().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_stops_prober() {
        let transport = MockTransport::new();
        let config =
            ApnsConfig::new("gateway.test", 2197).with_keep_alive(Duration::from_secs(60));
        let connection = ApnsConnection::with_transport(config, transport);

        let handle = connection.keep_alive().expect("handle").clone();
        connection.shutdown();

        assert!(handle.is_stopped());
        assert!(connection.prober.lock().is_none());
    }

    #[tokio::test]
    async fn test_connection_ids_unique() {
        let a = connection(MockTransport::new());
        let b = connection(MockTransport::new());
        assert_ne!(a.id(), b.id());
    }
}
