//! Positions slice — the store's view of the latest `positions` snapshot.

use tc_core::{Position, PositionsEvent};

/// The positions slice of application state.
///
/// Replaced wholesale by each `positions` event; the event carries complete
/// active and inactive lists, so there is nothing to merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionsState {
    pub user_id: String,
    pub total_position_value: f64,
    pub total_unrealized_pnl: f64,
    pub timestamp: String,
    pub active: Vec<Position>,
    pub inactive: Vec<Position>,
    pub total_count: u32,
    pub active_count: u32,
    /// Wall-clock ms of the last applied event.
    pub last_updated_ms: u64,
}

impl PositionsState {
    /// Replace this slice with the contents of a normalized event.
    pub(crate) fn apply(&mut self, ev: PositionsEvent, now_ms: u64) {
        *self = Self {
            user_id: ev.user_id,
            total_position_value: ev.total_position_value,
            total_unrealized_pnl: ev.total_unrealized_pnl,
            timestamp: ev.timestamp,
            active: ev.active_positions,
            inactive: ev.inactive_positions,
            total_count: ev.total_positions_count,
            active_count: ev.active_positions_count,
            last_updated_ms: now_ms,
        };
    }

    /// Look up an active position by its `(venue, symbol)` identity.
    pub fn find(&self, venue: &str, symbol: &str) -> Option<&Position> {
        self.active.iter().find(|p| p.venue == venue && p.symbol == symbol)
    }
}
