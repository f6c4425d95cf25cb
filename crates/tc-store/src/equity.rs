//! Equity slice — the store's view of the latest `equity` snapshot.

use tc_core::{EquityEvent, VenueEquity};

/// The equity slice of application state — portfolio-wide totals plus the
/// complete per-venue list. Replaced wholesale by each `equity` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityState {
    pub user_id: String,
    pub total_wallet_balance: f64,
    pub total_available_balance: f64,
    pub total_unrealized_pnl: f64,
    pub total_bnb_balance_usdt: f64,
    pub timestamp: String,
    pub venues: Vec<VenueEquity>,
    /// Wall-clock ms of the last applied event.
    pub last_updated_ms: u64,
}

impl EquityState {
    /// Replace this slice with the contents of a normalized event.
    pub(crate) fn apply(&mut self, ev: EquityEvent, now_ms: u64) {
        *self = Self {
            user_id: ev.user_id,
            total_wallet_balance: ev.total_wallet_balance,
            total_available_balance: ev.total_available_balance,
            total_unrealized_pnl: ev.total_unrealized_pnl,
            total_bnb_balance_usdt: ev.total_bnb_balance_usdt,
            timestamp: ev.timestamp,
            venues: ev.venue_equities,
            last_updated_ms: now_ms,
        };
    }

    /// Look up the equity snapshot for one venue.
    pub fn venue(&self, venue: &str) -> Option<&VenueEquity> {
        self.venues.iter().find(|v| v.venue == venue)
    }
}
