//! Connection supervisor — binds the stream lifecycle to authentication
//! state and provides self-healing.
//!
//! On login the supervisor attaches the dispatch bridge and connects with
//! bounded exponential backoff; a fixed-interval liveness check then issues
//! at most one reconnect attempt per cycle while the stream is silent. On
//! logout everything is torn down and the store is reset so a future
//! re-authentication performs a full fresh connect.
//!
//! The supervisor is an explicitly constructed, dependency-injected instance
//! owned by the composition root, with an explicit `start()`/`stop()` pair.
//! Exactly one supervised session runs at a time; re-entrant `start()` is a
//! no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tc_core::config::SupervisorSettings;
use tc_store::AppStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bridge::DispatchBridge;
use crate::client::EventStreamClient;

/// Supervisor policy knobs.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Interval between liveness checks.
    pub liveness_interval: Duration,
    /// Initial connect backoff.
    pub backoff_initial: Duration,
    /// Backoff ceiling.
    pub backoff_max: Duration,
    /// Connect attempts per auth transition before the failure is surfaced
    /// as persistent.
    pub max_connect_retries: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            liveness_interval: Duration::from_secs(30),
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            max_connect_retries: 10,
        }
    }
}

impl SupervisorConfig {
    /// Build from the config-file settings block.
    pub fn from_settings(settings: &SupervisorSettings) -> Self {
        Self {
            liveness_interval: settings.effective_liveness_interval(),
            backoff_initial: settings.effective_backoff_initial(),
            backoff_max: settings.effective_backoff_max(),
            max_connect_retries: settings.effective_max_retries(),
        }
    }
}

/// The connection supervisor.
pub struct ConnectionSupervisor {
    client: Arc<EventStreamClient>,
    store: Arc<AppStore>,
    config: SupervisorConfig,
    bridge: Mutex<Option<DispatchBridge>>,
    active: AtomicBool,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl ConnectionSupervisor {
    pub fn new(
        client: Arc<EventStreamClient>,
        store: Arc<AppStore>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
            bridge: Mutex::new(None),
            active: AtomicBool::new(false),
            task: Mutex::new(None),
            shutdown: Mutex::new(None),
        }
    }

    /// Begin supervising against the given authentication channel.
    ///
    /// Re-entrant activation while already active is a no-op.
    pub fn start(self: &Arc<Self>, auth_rx: watch::Receiver<bool>) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("supervisor already active");
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown.lock() = Some(shutdown_tx);

        let supervisor = Arc::clone(self);
        *self.task.lock() = Some(tokio::spawn(async move {
            supervisor.supervise(auth_rx, shutdown_rx).await;
        }));
    }

    /// Stop supervising: clear the liveness timer, tear down the bridge and
    /// transport, release subscriptions. Idempotent.
    pub fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.disconnect_event_listeners();
        info!("supervisor stopped");
    }

    /// Idempotent bootstrap: attach the dispatch bridge and connect with
    /// bounded exponential backoff. Returns `true` once connected (or if the
    /// stream is already live); on retry exhaustion the failure is surfaced
    /// in the store and `false` is returned.
    pub async fn initialize_event_listeners(&self) -> bool {
        if self.client.is_active() {
            return true;
        }
        {
            let mut bridge = self.bridge.lock();
            if bridge.is_none() {
                *bridge = Some(DispatchBridge::attach(&self.client, &self.store));
            }
        }

        // Bounded loop with an explicit counter; on exhaustion the error
        // persists in the store and the liveness cycle takes over.
        let mut backoff = self.config.backoff_initial;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let ok = self.client.connect().await;
            self.store.set_connected(ok);
            if ok {
                return true;
            }
            if attempt >= self.config.max_connect_retries {
                warn!(attempt, "giving up on event stream for now");
                self.store
                    .set_error(format!("unable to establish event stream after {attempt} attempts"));
                return false;
            }
            debug!(attempt, backoff_ms = backoff.as_millis() as u64, "connect failed, backing off");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.config.backoff_max);
        }
    }

    /// Tear down the bridge and transport. Safe to call when already down.
    pub fn disconnect_event_listeners(&self) {
        if let Some(bridge) = self.bridge.lock().take() {
            bridge.detach();
        }
        self.client.disconnect();
    }

    /// True if the supervised stream is currently live.
    pub fn is_event_listener_active(&self) -> bool {
        self.client.is_active()
    }

    async fn supervise(
        &self,
        mut auth_rx: watch::Receiver<bool>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut check = tokio::time::interval(self.config.liveness_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        check.reset(); // first tick one full period out, not immediately

        // Apply the auth state present at startup, then react to transitions.
        let mut authenticated = *auth_rx.borrow_and_update();
        if authenticated {
            self.store.set_authenticated(true);
            self.initialize_event_listeners().await;
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,

                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        // Auth source dropped; nothing left to supervise.
                        break;
                    }
                    authenticated = *auth_rx.borrow_and_update();
                    if authenticated {
                        info!("authenticated, starting event stream");
                        self.store.set_authenticated(true);
                        self.initialize_event_listeners().await;
                    } else {
                        info!("logged out, tearing down event stream");
                        self.disconnect_event_listeners();
                        self.store.reset();
                    }
                }

                _ = check.tick() => {
                    if authenticated && !self.client.is_active() {
                        warn!("event stream inactive, reconnecting");
                        self.store.set_connected(false);
                        // One attempt per check cycle; the interval itself is
                        // the rate limit.
                        let ok = self.client.connect().await;
                        self.store.set_connected(ok);
                        if !ok {
                            self.store.set_error("event stream reconnect failed");
                        }
                    }
                }
            }
        }
    }
}
