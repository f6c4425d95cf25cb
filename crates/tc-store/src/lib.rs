//! # tc-store
//!
//! Centralized application state store for the trade-companion sync engine.
//!
//! The store owns three slices — positions, equity, connection health — and
//! exposes reducer-style update commands with **full-replace** semantics:
//! each `positions`/`equity` event substitutes the entire slice, never
//! merging into it. Reads go through pure selectors returning clones, and a
//! `tokio::sync::watch` channel carries a monotonically increasing version
//! so reactive consumers (the UI layer) can observe changes without polling.
//!
//! The store holds no knowledge of the wire format; it only ever sees the
//! normalized typed events from `tc-core`.

pub mod equity;
pub mod positions;

mod connection;

use parking_lot::RwLock;
use tc_core::{ConnectionState, EquityEvent, Position, PositionsEvent, time_util};
use tokio::sync::watch;
use tracing::debug;

pub use equity::EquityState;
pub use positions::PositionsState;

/// Complete application state — one value behind the store's lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub positions: PositionsState,
    pub equity: EquityState,
    pub connection: ConnectionState,
    /// Bumped by every mutation; published on the change channel.
    pub version: u64,
}

/// The centralized store.
///
/// Cheap to share behind an `Arc`; all commands take `&self`.
pub struct AppStore {
    state: RwLock<AppState>,
    changes: watch::Sender<u64>,
}

impl AppStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self { state: RwLock::new(AppState::default()), changes }
    }

    /// Run one mutation, bump the version, and notify watchers.
    fn mutate(&self, f: impl FnOnce(&mut AppState)) {
        let version = {
            let mut state = self.state.write();
            f(&mut state);
            state.version += 1;
            state.version
        };
        // Send fails only when no receiver exists, which is fine.
        let _ = self.changes.send(version);
    }

    // -----------------------------------------------------------------------
    // Update commands
    // -----------------------------------------------------------------------

    /// Replace the positions slice with a normalized `positions` event.
    pub fn update_positions(&self, ev: PositionsEvent) {
        let now = time_util::now_ms();
        debug!(active = ev.active_positions.len(), inactive = ev.inactive_positions.len(), "positions snapshot applied");
        self.mutate(|s| s.positions.apply(ev, now));
    }

    /// Replace the equity slice with a normalized `equity` event.
    pub fn update_equity(&self, ev: EquityEvent) {
        let now = time_util::now_ms();
        debug!(venues = ev.venue_equities.len(), "equity snapshot applied");
        self.mutate(|s| s.equity.apply(ev, now));
    }

    /// Record a connect-attempt outcome or a liveness transition.
    ///
    /// The first call marks the session initialized, whatever the outcome;
    /// a successful connection clears `last_error`.
    pub fn set_connected(&self, connected: bool) {
        self.mutate(|s| connection::apply_connected(&mut s.connection, connected));
    }

    /// Record a connection error message.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|s| connection::apply_error(&mut s.connection, message));
    }

    /// Mirror the authentication flag into the connection slice.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.mutate(|s| connection::apply_authenticated(&mut s.connection, authenticated));
    }

    /// Full session reset (logout): all slices back to defaults, including
    /// the `is_initialized` flag, so a re-authentication performs a fresh
    /// connect. The version keeps counting so watchers see the reset.
    pub fn reset(&self) {
        self.mutate(|s| {
            let version = s.version;
            *s = AppState::default();
            s.version = version;
        });
    }

    // -----------------------------------------------------------------------
    // Selectors
    // -----------------------------------------------------------------------

    pub fn positions(&self) -> PositionsState {
        self.state.read().positions.clone()
    }

    pub fn equity(&self) -> EquityState {
        self.state.read().equity.clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.state.read().connection.clone()
    }

    /// The complete active position list.
    pub fn active_positions(&self) -> Vec<Position> {
        self.state.read().positions.active.clone()
    }

    /// Look up one active position by its `(venue, symbol)` identity.
    pub fn position(&self, venue: &str, symbol: &str) -> Option<Position> {
        self.state.read().positions.find(venue, symbol).cloned()
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Change-notification channel: receives the store version after each
    /// mutation. Intended for reactive consumers; the value itself is only
    /// a hint to re-read through selectors.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::normalize;
    use serde_json::json;

    fn positions_event(symbols: &[&str]) -> PositionsEvent {
        let items: Vec<_> = symbols
            .iter()
            .map(|s| json!({ "symbol": s, "venue": "binance", "side": "long", "qty": 1 }))
            .collect();
        normalize::positions_event(&json!({
            "active_positions": items,
            "active_positions_count": symbols.len(),
            "total_positions_count": symbols.len(),
        }))
    }

    #[test]
    fn positions_replace_never_merge() {
        let store = AppStore::new();
        store.update_positions(positions_event(&["A", "B"]));
        assert_eq!(store.positions().active.len(), 2);

        // A later snapshot containing only C must fully replace [A, B].
        store.update_positions(positions_event(&["C"]));
        let active = store.active_positions();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].symbol, "C");
    }

    #[test]
    fn equity_replace_never_merge() {
        let store = AppStore::new();
        let ev = normalize::equity_event(&json!({
            "venue_equities": [{ "venue": "binance", "wallet_balance": 100.0 }]
        }));
        store.update_equity(ev);
        assert_eq!(store.equity().venues.len(), 1);

        let ev = normalize::equity_event(&json!({
            "venue_equities": [{ "venue": "bybit", "wallet_balance": 50.0 }]
        }));
        store.update_equity(ev);
        let equity = store.equity();
        assert_eq!(equity.venues.len(), 1);
        assert_eq!(equity.venues[0].venue, "bybit");
        assert!(equity.last_updated_ms > 0);
    }

    #[test]
    fn initialized_flag_is_monotone() {
        let store = AppStore::new();
        assert!(!store.connection().is_initialized);

        // A failed first attempt still initializes.
        store.set_connected(false);
        assert!(store.connection().is_initialized);
        assert!(!store.connection().is_connected);

        store.set_connected(true);
        store.set_connected(false);
        assert!(store.connection().is_initialized);

        // Only the full session reset clears it.
        store.reset();
        assert!(!store.connection().is_initialized);
    }

    #[test]
    fn successful_connect_clears_error() {
        let store = AppStore::new();
        store.set_error("connect timed out");
        assert_eq!(store.connection().last_error.as_deref(), Some("connect timed out"));

        store.set_connected(false);
        assert!(store.connection().last_error.is_some()); // failure keeps the error

        store.set_connected(true);
        assert_eq!(store.connection().last_error, None);
    }

    #[test]
    fn venue_symbol_lookup() {
        let store = AppStore::new();
        store.update_positions(normalize::positions_event(&json!({
            "active_positions": [
                { "symbol": "BTC", "venue": "binance" },
                { "symbol": "BTC", "venue": "bybit" }
            ]
        })));
        assert!(store.position("bybit", "BTC").is_some());
        assert!(store.position("okx", "BTC").is_none());
    }

    #[test]
    fn mutations_notify_watchers() {
        let store = AppStore::new();
        let mut rx = store.subscribe_changes();
        assert_eq!(*rx.borrow_and_update(), 0);

        store.set_authenticated(true);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);

        store.update_positions(positions_event(&["A"]));
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn reset_keeps_version_counting() {
        let store = AppStore::new();
        store.set_connected(true);
        store.update_positions(positions_event(&["A"]));
        let before = store.version();

        store.reset();
        assert!(store.version() > before); // watchers observe the reset
        assert_eq!(store.positions(), PositionsState::default());
        assert_eq!(store.connection(), ConnectionState::default());
    }
}
