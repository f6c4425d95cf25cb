//! Dispatch bridge — typed events to store commands.
//!
//! A stateless translation layer wired in at connect time and torn down at
//! disconnect time: each domain-bearing event kind maps to exactly one
//! store update carrying the fully normalized, fully-replacing payload.
//! Liveness frames update no domain state — the client tracks the staleness
//! clock itself — and `market_data` stays a subscriber-only feed with no
//! store slice.

use std::sync::Arc;

use tc_core::{EventKind, StreamEvent};
use tc_store::AppStore;
use tracing::{debug, trace};

use crate::client::EventStreamClient;
use crate::registry::Subscription;

/// Holds the store-facing subscriptions for one connect/disconnect cycle.
pub struct DispatchBridge {
    subscriptions: Vec<Subscription>,
}

impl DispatchBridge {
    /// Wire the store to the client's event stream.
    pub fn attach(client: &EventStreamClient, store: &Arc<AppStore>) -> Self {
        let positions = {
            let store = Arc::clone(store);
            client.subscribe(EventKind::Positions, move |event| {
                if let StreamEvent::Positions(ev) = event {
                    store.update_positions(ev.clone());
                }
            })
        };

        let equity = {
            let store = Arc::clone(store);
            client.subscribe(EventKind::Equity, move |event| {
                if let StreamEvent::Equity(ev) = event {
                    store.update_equity(ev.clone());
                }
            })
        };

        let ping = client.subscribe(EventKind::Ping, |event| {
            if let StreamEvent::Ping(ping) = event {
                if ping.is_connect_ack() {
                    debug!("connection acknowledged by server");
                } else {
                    trace!("liveness ping");
                }
            }
        });

        Self { subscriptions: vec![positions, equity, ping] }
    }

    /// Release every store-facing subscription.
    pub fn detach(self) {
        for sub in &self.subscriptions {
            sub.unsubscribe();
        }
    }
}
