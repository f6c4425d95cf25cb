//! Position records and the `positions` event payload.

use serde::{Deserialize, Serialize};

/// One open or closed trade record.
///
/// The wire format guarantees no single primary key; consumers key active
/// positions by `(venue, symbol)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub venue: String,
    pub symbol: String,
    /// `"long"` or `"short"` (empty if the wire omitted it).
    pub side: String,
    pub quantity: f64,
    pub notional_amount: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub liquidation_price: Option<f64>,
    pub unrealized_pnl: f64,
    pub realized_pnl_current: Option<f64>,
    pub realized_pnl_cumulative: Option<f64>,
    pub leverage: f64,
    pub timestamp: String,
}

/// Payload of a `positions` frame.
///
/// Carries the *complete* active and inactive lists — never deltas. The
/// store replaces its position arrays wholesale on each event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsEvent {
    pub user_id: String,
    pub total_position_value: f64,
    pub total_unrealized_pnl: f64,
    pub timestamp: String,
    pub active_positions: Vec<Position>,
    pub inactive_positions: Vec<Position>,
    pub total_positions_count: u32,
    pub active_positions_count: u32,
}
