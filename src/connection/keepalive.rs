//! Keep-alive prober.
//!
//! A background task that periodically issues protocol-level PING
//! probes so idle transports are not torn down by the peer. The prober
//! is owned by its connection and communicates through a
//! [`KeepAliveHandle`]: an atomic desired period plus a stop signal,
//! checked at each firing.
//!
//! Probe failures are logged and swallowed; keep-alive is advisory and
//! the next send surfaces any real transport fault.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::identifiers::ConnectionId;
use crate::transport::{PING_PAYLOAD, PushTransport};

// ============================================================================
// Constants
// ============================================================================

/// Delay between connection construction and the first probe.
pub(crate) const STARTUP_DELAY: Duration = Duration::from_secs(30);

/// Deadline for a single PING probe.
pub(crate) const PING_DEADLINE: Duration = Duration::from_secs(2);

// ============================================================================
// KeepAliveHandle
// ============================================================================

/// Shared prober state.
struct KeepAliveShared {
    /// Desired period between probes, in milliseconds.
    period_ms: AtomicU64,

    /// Set when the prober should exit at its next firing.
    stop: AtomicBool,
}

/// Runtime controls for the keep-alive prober.
///
/// Cloneable; the connection holds one clone and hands others to
/// whoever coordinates shutdown (e.g. a broker). Period changes take
/// effect after the next firing on the old schedule; stopping is
/// terminal.
#[derive(Clone)]
pub struct KeepAliveHandle {
    shared: Arc<KeepAliveShared>,
}

impl KeepAliveHandle {
    /// Creates a handle with the given initial period.
    #[must_use]
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            shared: Arc::new(KeepAliveShared {
                period_ms: AtomicU64::new(period.as_millis() as u64),
                stop: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the desired probe period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.shared.period_ms.load(Ordering::Acquire))
    }

    /// Changes the desired probe period.
    ///
    /// The next firing still occurs on the old schedule; the new period
    /// applies from that firing onward.
    #[inline]
    pub fn set_period(&self, period: Duration) {
        self.shared
            .period_ms
            .store(period.as_millis() as u64, Ordering::Release);
    }

    /// Signals the prober to exit at its next firing.
    ///
    /// Terminal; there is no restart.
    #[inline]
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for KeepAliveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAliveHandle")
            .field("period", &self.period())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ============================================================================
// Prober Task
// ============================================================================

/// Spawns the prober task for a connection.
///
/// The probe serializes against sends through `send_guard`, so a PING
/// never interleaves with an in-flight POST on the shared transport.
pub(crate) fn spawn_prober(
    connection_id: ConnectionId,
    transport: Arc<dyn PushTransport>,
    send_guard: Arc<Mutex<()>>,
    handle: KeepAliveHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(%connection_id, period = ?handle.period(), "keep-alive prober started");

        let mut applied = handle.period();
        sleep(STARTUP_DELAY).await;

        loop {
            if handle.is_stopped() {
                info!(%connection_id, "keep-alive prober stopping");
                break;
            }

            let probe = {
                let _serialized = send_guard.lock().await;
                timeout(PING_DEADLINE, transport.ping(PING_PAYLOAD)).await
            };

            match probe {
                Ok(Ok(pong)) => debug!(%connection_id, pong, "keep-alive probe"),
                Ok(Err(e)) => warn!(%connection_id, error = %e, "keep-alive probe failed"),
                Err(_) => warn!(
                    %connection_id,
                    deadline_ms = PING_DEADLINE.as_millis() as u64,
                    "keep-alive probe timed out"
                ),
            }

            let desired = handle.period();
            if desired != applied {
                info!(%connection_id, old = ?applied, new = ?desired, "keep-alive period changed");
                applied = desired;
            }

            sleep(applied).await;
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use http::Request;
    use tokio::time::advance;

    use crate::error::{Error, Result};
    use crate::transport::TransportResponse;

    struct ProbeCounter {
        pings: AtomicUsize,
        fail: AtomicBool,
    }

    impl ProbeCounter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pings: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }

        fn count(&self) -> usize {
            self.pings.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PushTransport for ProbeCounter {
        async fn post(&self, _request: Request<Vec<u8>>) -> Result<TransportResponse> {
            Err(Error::ConnectionClosed)
        }

        async fn ping(&self, payload: [u8; 8]) -> Result<bool> {
            assert_eq!(payload, PING_PAYLOAD);
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::ConnectionClosed)
            } else {
                Ok(true)
            }
        }
    }

    /// Spawns a prober and lets it register its startup sleep before
    /// the test starts advancing the paused clock.
    async fn spawn(
        transport: Arc<ProbeCounter>,
        period: Duration,
    ) -> (KeepAliveHandle, JoinHandle<()>) {
        let handle = KeepAliveHandle::new(period);
        let task = spawn_prober(
            ConnectionId::next(),
            transport,
            Arc::new(Mutex::new(())),
            handle.clone(),
        );
        settle().await;
        (handle, task)
    }

    /// Lets spawned tasks run; consumes 1ms of the paused timeline.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_probe_after_startup_delay() {
        init_tracing();
        let transport = ProbeCounter::new();
        let (_handle, _task) = spawn(Arc::clone(&transport), Duration::from_secs(60)).await;

        advance(Duration::from_secs(29)).await;
        settle().await;
        assert_eq!(transport.count(), 0);

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_before_first_probe() {
        let transport = ProbeCounter::new();
        let (handle, task) = spawn(Arc::clone(&transport), Duration::from_secs(60)).await;

        handle.stop();
        advance(Duration::from_secs(31)).await;
        settle().await;

        assert_eq!(transport.count(), 0);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal_after_probes() {
        let transport = ProbeCounter::new();
        let (handle, task) = spawn(Arc::clone(&transport), Duration::from_secs(10)).await;

        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(transport.count(), 1);

        handle.stop();
        advance(Duration::from_secs(60)).await;
        settle().await;

        assert_eq!(transport.count(), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_change_applies_after_next_firing() {
        let transport = ProbeCounter::new();
        let (handle, _task) = spawn(Arc::clone(&transport), Duration::from_secs(60)).await;

        // First probe fires at the startup delay.
        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(transport.count(), 1);

        handle.set_period(Duration::from_secs(10));

        // The next firing still happens on the old 60s schedule.
        advance(Duration::from_secs(59)).await;
        settle().await;
        assert_eq!(transport.count(), 1);

        advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(transport.count(), 2);

        // From here the new 10s period is applied.
        advance(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(transport.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_is_swallowed() {
        let transport = ProbeCounter::new();
        transport.fail.store(true, Ordering::SeqCst);
        let (_handle, task) = spawn(Arc::clone(&transport), Duration::from_secs(10)).await;

        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(transport.count(), 1);

        // A failed probe does not stop the prober.
        advance(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(transport.count(), 2);
        assert!(!task.is_finished());
    }

    #[test]
    fn test_handle_defaults() {
        let handle = KeepAliveHandle::new(Duration::from_secs(60));
        assert_eq!(handle.period(), Duration::from_secs(60));
        assert!(!handle.is_stopped());

        handle.set_period(Duration::from_secs(5));
        assert_eq!(handle.period(), Duration::from_secs(5));

        handle.stop();
        assert!(handle.is_stopped());
    }
}
