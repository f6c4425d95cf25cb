//! Event stream client — owns the single long-lived server-push connection.
//!
//! One client instance owns at most one live transport. Frames are processed
//! serially: decode → parse/normalize → dispatch to a snapshot of
//! subscribers, to completion, before the next frame is read. Reconnection
//! is not handled here — the supervisor issues a fresh `connect()`.
//!
//! Nothing crosses this boundary as an error or a panic: `connect()` reports
//! failure as `false`, read failures end the frame loop and flip the
//! connected flag, and a torn-down client drops late frames via the epoch
//! guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tc_core::{EventKind, StreamEvent, time_util};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::parser;
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::transport::{FrameSource, RawFrame, StreamTransport};

/// Read-only snapshot of connection diagnostics.
#[derive(Debug, Clone)]
pub struct StreamDebugInfo {
    pub session_id: Uuid,
    pub connected: bool,
    pub epoch: u64,
    pub connect_attempts: u64,
    pub frames_received: u64,
    /// Age of the last received frame; `None` before the first frame.
    pub last_frame_age: Option<Duration>,
    pub last_error: Option<String>,
    pub subscriber_count: usize,
}

/// State shared with the reader task.
struct ReaderShared {
    registry: Arc<SubscriptionRegistry>,
    epoch: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
    last_frame_us: Arc<AtomicU64>,
    frames_received: Arc<AtomicU64>,
}

impl ReaderShared {
    /// Process one frame to completion. Returns `false` if the transport was
    /// superseded while the frame was in flight — late frames are no-ops.
    fn process_frame(&self, epoch_at_start: u64, frame: &RawFrame) -> bool {
        if self.epoch.load(Ordering::SeqCst) != epoch_at_start {
            return false;
        }
        self.last_frame_us.store(time_util::monotonic_us(), Ordering::SeqCst);
        self.frames_received.fetch_add(1, Ordering::Relaxed);

        let Some(event) = parser::parse_frame(frame) else {
            return true; // dropped frame; the stream stays alive
        };

        // Revalidate after parsing so a disconnect issued mid-processing wins
        // over the dispatch.
        if self.epoch.load(Ordering::SeqCst) != epoch_at_start {
            return false;
        }
        if let StreamEvent::Ping(ping) = &event {
            if ping.is_connect_ack() {
                debug!("server acknowledged connection");
            }
        }
        self.registry.dispatch(&event);
        true
    }
}

/// The event stream client.
///
/// Cheap to share behind an `Arc`; all operations take `&self` and are safe
/// from the supervisor's single control-flow context.
pub struct EventStreamClient {
    transport: Arc<dyn StreamTransport>,
    registry: Arc<SubscriptionRegistry>,
    token_rx: watch::Receiver<Option<String>>,
    staleness: Duration,
    session_id: Uuid,

    /// Generation counter, bumped synchronously on every teardown so an
    /// in-flight frame from a previous transport is dropped, not dispatched.
    epoch: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
    /// Monotonic µs of the last received frame; 0 = none on this transport.
    last_frame_us: Arc<AtomicU64>,
    frames_received: Arc<AtomicU64>,
    connect_attempts: AtomicU64,
    last_error: Mutex<Option<String>>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl EventStreamClient {
    /// Create a client over the given transport.
    ///
    /// `token_rx` supplies the current session credential at connect time;
    /// `staleness` is the window after which a silent connection no longer
    /// counts as active.
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        token_rx: watch::Receiver<Option<String>>,
        staleness: Duration,
    ) -> Self {
        Self {
            transport,
            registry: SubscriptionRegistry::new(),
            token_rx,
            staleness,
            session_id: Uuid::new_v4(),
            epoch: Arc::new(AtomicU64::new(0)),
            connected: Arc::new(AtomicBool::new(false)),
            last_frame_us: Arc::new(AtomicU64::new(0)),
            frames_received: Arc::new(AtomicU64::new(0)),
            connect_attempts: AtomicU64::new(0),
            last_error: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    /// Open the transport and start the frame loop.
    ///
    /// Returns `true` once the transport is established and the first frame
    /// has been processed; `false` on establishment failure or if the stream
    /// ends before any frame — never an error, never a panic. Calling while
    /// already connected first tears down the existing transport; the restart
    /// preserves subscriptions, and the epoch guard guarantees no frame is
    /// delivered twice.
    pub async fn connect(&self) -> bool {
        self.teardown_transport();
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);

        let token = self.token_rx.borrow().clone();
        let mut source = match self.transport.open(token.as_deref()).await {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "failed to establish event stream");
                *self.last_error.lock() = Some(e.to_string());
                return false;
            }
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);

        let shared = ReaderShared {
            registry: Arc::clone(&self.registry),
            epoch: Arc::clone(&self.epoch),
            connected: Arc::clone(&self.connected),
            last_frame_us: Arc::clone(&self.last_frame_us),
            frames_received: Arc::clone(&self.frames_received),
        };
        let (first_tx, first_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            reader_loop(source.as_mut(), epoch, &shared, first_tx).await;
        });
        *self.reader.lock() = Some(task);

        match first_rx.await {
            Ok(()) => {
                info!(session = %self.session_id, "event stream connected");
                *self.last_error.lock() = None;
                true
            }
            Err(_) => {
                warn!("event stream ended before the first frame");
                *self.last_error.lock() = Some("stream ended before first frame".to_string());
                self.teardown_transport();
                false
            }
        }
    }

    /// Register a callback for one event kind. See
    /// [`SubscriptionRegistry::subscribe`] for ordering and isolation
    /// guarantees.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&StreamEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.registry.subscribe(kind, callback)
    }

    /// Close the transport and release all subscriptions. Idempotent.
    ///
    /// Synchronously invalidates in-flight frame processing: the epoch bump
    /// happens before this returns, so a frame that was mid-flight dispatches
    /// into nothing.
    pub fn disconnect(&self) {
        self.teardown_transport();
        self.registry.clear();
    }

    /// True if the transport is open and a frame arrived within the
    /// staleness window.
    pub fn is_active(&self) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let last = self.last_frame_us.load(Ordering::SeqCst);
        last != 0
            && time_util::monotonic_us().saturating_sub(last) <= self.staleness.as_micros() as u64
    }

    /// Read-only diagnostics snapshot. No side effects.
    pub fn debug_info(&self) -> StreamDebugInfo {
        let last = self.last_frame_us.load(Ordering::SeqCst);
        StreamDebugInfo {
            session_id: self.session_id,
            connected: self.connected.load(Ordering::SeqCst),
            epoch: self.epoch.load(Ordering::SeqCst),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            last_frame_age: (last != 0).then(|| {
                Duration::from_micros(time_util::monotonic_us().saturating_sub(last))
            }),
            last_error: self.last_error.lock().clone(),
            subscriber_count: self.registry.len(),
        }
    }

    pub(crate) fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Invalidate the current transport: bump the epoch (late frames become
    /// no-ops), abort the reader, mark disconnected. Subscriptions survive —
    /// [`disconnect`](Self::disconnect) is the full teardown.
    fn teardown_transport(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.last_frame_us.store(0, Ordering::SeqCst);
        if let Some(task) = self.reader.lock().take() {
            task.abort();
        }
    }
}

/// Serial frame loop: one frame to completion before the next is read.
async fn reader_loop(
    source: &mut dyn FrameSource,
    epoch_at_start: u64,
    shared: &ReaderShared,
    first_frame: oneshot::Sender<()>,
) {
    let mut first_frame = Some(first_frame);
    loop {
        if shared.epoch.load(Ordering::SeqCst) != epoch_at_start {
            return; // superseded by a newer transport
        }
        let frame = match source.next_frame().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                warn!(error = %e, "event stream read failed");
                break;
            }
            None => {
                debug!("event stream closed by server");
                break;
            }
        };
        if !shared.process_frame(epoch_at_start, &frame) {
            return;
        }
        if let Some(tx) = first_frame.take() {
            let _ = tx.send(());
        }
    }

    // Stream ended while still the current transport — flip the flag so
    // `is_active()` reports the loss immediately.
    if shared.epoch.load(Ordering::SeqCst) == epoch_at_start {
        shared.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ChannelTransport;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    const POSITIONS_DATA: &str = r#"{"active_positions":[{"symbol":"BTC","venue":"binance"}]}"#;

    fn make_client(
        transport: Arc<ChannelTransport>,
        staleness: Duration,
    ) -> (Arc<EventStreamClient>, watch::Sender<Option<String>>) {
        let (token_tx, token_rx) = watch::channel(Some("token-1".to_string()));
        (Arc::new(EventStreamClient::new(transport, token_rx, staleness)), token_tx)
    }

    /// Drive `connect()` while answering the scripted transport with an
    /// initial ping, returning the session handle for further frames.
    async fn connect_with_ping(
        client: &Arc<EventStreamClient>,
        sessions: &mut mpsc::UnboundedReceiver<crate::testing::SessionHandle>,
    ) -> (bool, crate::testing::SessionHandle) {
        let connecting = {
            let client = Arc::clone(client);
            tokio::spawn(async move { client.connect().await })
        };
        let session = sessions.recv().await.expect("transport not opened");
        session.send("ping", r#"{"message":"connected","connected":true}"#);
        (connecting.await.expect("connect task failed"), session)
    }

    #[tokio::test]
    async fn connect_reports_true_after_first_frame() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport.clone(), Duration::from_secs(5));

        let (ok, _session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);
        assert!(client.is_active());
        assert_eq!(transport.last_token().as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn connect_reports_false_on_establishment_failure() {
        let (transport, _sessions) = ChannelTransport::new();
        transport.fail_next(1);
        let (client, _token) = make_client(transport, Duration::from_secs(5));

        assert!(!client.connect().await);
        assert!(!client.is_active());
        assert!(client.debug_info().last_error.is_some());
    }

    #[tokio::test]
    async fn connect_reports_false_when_stream_ends_before_first_frame() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport, Duration::from_secs(5));

        let connecting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.connect().await })
        };
        let session = sessions.recv().await.expect("transport not opened");
        session.close(); // server hangs up immediately
        assert!(!connecting.await.expect("connect task failed"));
        assert!(!client.is_active());
    }

    #[tokio::test]
    async fn frames_reach_subscribers() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport, Duration::from_secs(5));

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = client.subscribe(EventKind::Positions, move |event| {
            if let StreamEvent::Positions(ev) = event {
                assert_eq!(ev.active_positions[0].symbol, "BTC");
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (ok, session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);

        session.send("positions", POSITIONS_DATA);
        // The reader task is asynchronous; wait for the dispatch.
        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconnect_while_connected_delivers_each_frame_once() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport.clone(), Duration::from_secs(5));

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = client.subscribe(EventKind::Positions, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let (ok, old_session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);

        // Idempotent restart: the old transport is superseded.
        let (ok, new_session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);
        assert_eq!(transport.opened(), 2);

        // A late frame on the superseded transport must not be delivered.
        old_session.send("positions", POSITIONS_DATA);
        new_session.send("positions", POSITIONS_DATA);

        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_drops_in_flight_frames() {
        let (transport, _sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport, Duration::from_secs(5));

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = client.subscribe(EventKind::Positions, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        // Simulate a frame that was read before the teardown but dispatched
        // after: its epoch no longer matches, so it must be a no-op.
        let shared = ReaderShared {
            registry: Arc::clone(&client.registry),
            epoch: Arc::clone(&client.epoch),
            connected: Arc::clone(&client.connected),
            last_frame_us: Arc::clone(&client.last_frame_us),
            frames_received: Arc::clone(&client.frames_received),
        };
        let stale_epoch = client.epoch.load(Ordering::SeqCst);
        client.disconnect();

        let frame = RawFrame { event: "positions".into(), data: POSITIONS_DATA.into() };
        assert!(!shared.process_frame(stale_epoch, &frame));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_releases_subscriptions() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport, Duration::from_secs(5));
        let _sub = client.subscribe(EventKind::Ping, |_| {});

        let (ok, _session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);
        assert_eq!(client.debug_info().subscriber_count, 1);

        client.disconnect();
        client.disconnect();
        assert!(!client.is_active());
        assert_eq!(client.debug_info().subscriber_count, 0);
    }

    #[tokio::test]
    async fn staleness_window_marks_silent_connection_inactive() {
        let (transport, mut sessions) = ChannelTransport::new();
        let (client, _token) = make_client(transport, Duration::from_millis(40));

        let (ok, _session) = connect_with_ping(&client, &mut sessions).await;
        assert!(ok);
        assert!(client.is_active());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!client.is_active()); // still connected, but stale
        assert!(client.debug_info().connected);
    }
}
