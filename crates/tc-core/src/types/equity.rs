//! Venue equity records and the `equity` event payload.

use serde::{Deserialize, Serialize};

/// Per-venue balance snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueEquity {
    pub user_id: String,
    pub venue: String,
    pub timestamp: String,
    pub wallet_balance: f64,
    pub available_balance: f64,
    pub total_unrealized_pnl: f64,
    pub bnb_balance_usdt: f64,
}

/// Payload of an `equity` frame — portfolio-wide totals plus the complete
/// per-venue list. Full-replace semantics, like positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityEvent {
    pub user_id: String,
    pub total_wallet_balance: f64,
    pub total_available_balance: f64,
    pub total_unrealized_pnl: f64,
    pub total_bnb_balance_usdt: f64,
    pub timestamp: String,
    pub venue_equities: Vec<VenueEquity>,
}
