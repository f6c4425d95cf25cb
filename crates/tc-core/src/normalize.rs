//! Wire-format field normalization.
//!
//! The backend emits payloads with inconsistent field casing — the same
//! field may arrive as `walletBalance` or `wallet_balance`, and numeric
//! values may be JSON numbers or numeric strings. This module converts raw
//! `serde_json::Value` records into the canonical typed records in
//! [`crate::types`].
//!
//! Normalization is **total**: no function here returns an error or panics.
//! Missing numeric fields default to `0`, missing strings to `""`, missing
//! or non-array list fields to `[]`. Inputs are never mutated. Dynamic key
//! probing is confined to this module — everything past it works with typed
//! records.

use serde_json::Value;

use crate::types::{
    EquityEvent, HeartbeatEvent, MarketTick, PingEvent, Position, PositionsEvent, VenueEquity,
};

// ---------------------------------------------------------------------------
// Key lookup
// ---------------------------------------------------------------------------

/// Derive the snake_case form of a camelCase key (`fooBar` → `foo_bar`).
pub fn snake_key(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for ch in camel.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Look up a field by its camelCase name, falling back to the derived
/// snake_case name. Returns `None` if neither key is present or the record
/// is not an object.
pub fn field<'a>(record: &'a Value, camel: &str) -> Option<&'a Value> {
    let obj = record.as_object()?;
    if let Some(v) = obj.get(camel) {
        return Some(v);
    }
    obj.get(snake_key(camel).as_str())
}

/// Look up the first present field among several candidate camelCase names.
///
/// Used for fields the wire abbreviates inconsistently (`quantity` vs `qty`).
pub fn aliased_field<'a>(record: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| field(record, name))
}

// ---------------------------------------------------------------------------
// Typed accessors with defaults
// ---------------------------------------------------------------------------

/// Parse a JSON value (string or number) as `f64`.
///
/// Handles the common wire pattern where numeric values may be encoded as
/// either JSON strings (`"51000.5"`) or native numbers (`51000.5`).
#[inline]
fn value_as_f64(v: &Value) -> Option<f64> {
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

#[inline]
fn value_as_u64(v: &Value) -> Option<u64> {
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_u64()
    }
}

/// String field, defaulting to `""`.
pub fn str_field(record: &Value, camel: &str) -> String {
    field(record, camel).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

/// Numeric field (number or numeric string), defaulting to `0.0`.
pub fn f64_field(record: &Value, camel: &str) -> f64 {
    field(record, camel).and_then(value_as_f64).unwrap_or(0.0)
}

/// Optional numeric field — `None` when absent or unparseable.
pub fn opt_f64_field(record: &Value, camel: &str) -> Option<f64> {
    field(record, camel).and_then(value_as_f64)
}

/// Unsigned integer field, defaulting to `0`.
pub fn u64_field(record: &Value, camel: &str) -> u64 {
    field(record, camel).and_then(value_as_u64).unwrap_or(0)
}

/// Count field, defaulting to `0`.
pub fn u32_field(record: &Value, camel: &str) -> u32 {
    u64_field(record, camel).min(u32::MAX as u64) as u32
}

/// Boolean field with an explicit default.
pub fn bool_field(record: &Value, camel: &str, default: bool) -> bool {
    field(record, camel).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Array-valued field, normalized element-wise by the caller.
///
/// Missing keys and non-array values both normalize to an empty slice.
pub fn array_field<'a>(record: &'a Value, camel: &str) -> &'a [Value] {
    field(record, camel).and_then(|v| v.as_array()).map(Vec::as_slice).unwrap_or(&[])
}

// ---------------------------------------------------------------------------
// Event constructors
// ---------------------------------------------------------------------------

/// Normalize one position record.
pub fn position(record: &Value) -> Position {
    Position {
        venue: str_field(record, "venue"),
        symbol: str_field(record, "symbol"),
        side: str_field(record, "side"),
        quantity: aliased_field(record, &["quantity", "qty"]).and_then(value_as_f64).unwrap_or(0.0),
        notional_amount: f64_field(record, "notionalAmount"),
        entry_price: f64_field(record, "entryPrice"),
        mark_price: f64_field(record, "markPrice"),
        liquidation_price: opt_f64_field(record, "liquidationPrice"),
        unrealized_pnl: f64_field(record, "unrealizedPnl"),
        realized_pnl_current: opt_f64_field(record, "realizedPnlCurrent"),
        realized_pnl_cumulative: opt_f64_field(record, "realizedPnlCumulative"),
        leverage: f64_field(record, "leverage"),
        timestamp: str_field(record, "timestamp"),
    }
}

/// Normalize one venue-equity record.
pub fn venue_equity(record: &Value) -> VenueEquity {
    VenueEquity {
        user_id: str_field(record, "userId"),
        venue: str_field(record, "venue"),
        timestamp: str_field(record, "timestamp"),
        wallet_balance: f64_field(record, "walletBalance"),
        available_balance: f64_field(record, "availableBalance"),
        total_unrealized_pnl: f64_field(record, "totalUnrealizedPnl"),
        bnb_balance_usdt: f64_field(record, "bnbBalanceUsdt"),
    }
}

/// Normalize a `positions` frame payload.
pub fn positions_event(payload: &Value) -> PositionsEvent {
    PositionsEvent {
        user_id: str_field(payload, "userId"),
        total_position_value: f64_field(payload, "totalPositionValue"),
        total_unrealized_pnl: f64_field(payload, "totalUnrealizedPnl"),
        timestamp: str_field(payload, "timestamp"),
        active_positions: array_field(payload, "activePositions").iter().map(position).collect(),
        inactive_positions: array_field(payload, "inactivePositions").iter().map(position).collect(),
        total_positions_count: u32_field(payload, "totalPositionsCount"),
        active_positions_count: u32_field(payload, "activePositionsCount"),
    }
}

/// Normalize an `equity` frame payload.
pub fn equity_event(payload: &Value) -> EquityEvent {
    EquityEvent {
        user_id: str_field(payload, "userId"),
        total_wallet_balance: f64_field(payload, "totalWalletBalance"),
        total_available_balance: f64_field(payload, "totalAvailableBalance"),
        total_unrealized_pnl: f64_field(payload, "totalUnrealizedPnl"),
        total_bnb_balance_usdt: f64_field(payload, "totalBnbBalanceUsdt"),
        timestamp: str_field(payload, "timestamp"),
        venue_equities: array_field(payload, "venueEquities").iter().map(venue_equity).collect(),
    }
}

/// Normalize a `ping` frame payload.
pub fn ping_event(payload: &Value) -> PingEvent {
    PingEvent {
        message: str_field(payload, "message"),
        connected: bool_field(payload, "connected", false),
    }
}

/// Normalize a `heartbeat` frame payload.
pub fn heartbeat_event(payload: &Value) -> HeartbeatEvent {
    HeartbeatEvent { timestamp: str_field(payload, "timestamp") }
}

/// Normalize a `market_data` frame payload.
pub fn market_tick(payload: &Value) -> MarketTick {
    MarketTick {
        symbol: str_field(payload, "symbol"),
        price: f64_field(payload, "price"),
        timestamp: str_field(payload, "timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snake_key_conversion() {
        assert_eq!(snake_key("fooBar"), "foo_bar");
        assert_eq!(snake_key("totalUnrealizedPnl"), "total_unrealized_pnl");
        assert_eq!(snake_key("venue"), "venue"); // already lowercase
    }

    #[test]
    fn field_prefers_camel_then_snake() {
        let both = json!({ "walletBalance": 1.0, "wallet_balance": 2.0 });
        assert_eq!(field(&both, "walletBalance").and_then(Value::as_f64), Some(1.0));

        let snake_only = json!({ "wallet_balance": 2.0 });
        assert_eq!(field(&snake_only, "walletBalance").and_then(Value::as_f64), Some(2.0));
    }

    #[test]
    fn casing_equivalence() {
        let camel = json!({ "walletBalance": 42.5 });
        let snake = json!({ "wallet_balance": 42.5 });
        assert_eq!(f64_field(&camel, "walletBalance"), f64_field(&snake, "walletBalance"));
    }

    #[test]
    fn accessors_are_total() {
        // No matching key in any casing — defaults, never a panic.
        let record = json!({ "unrelated": true });
        assert_eq!(f64_field(&record, "walletBalance"), 0.0);
        assert_eq!(str_field(&record, "venue"), "");
        assert_eq!(u32_field(&record, "totalPositionsCount"), 0);
        assert_eq!(opt_f64_field(&record, "liquidationPrice"), None);
        assert!(array_field(&record, "activePositions").is_empty());

        // Non-object inputs are equally safe.
        for v in [Value::Null, json!(3), json!("x"), json!([1, 2])] {
            assert_eq!(f64_field(&v, "walletBalance"), 0.0);
            assert_eq!(str_field(&v, "venue"), "");
            assert!(array_field(&v, "activePositions").is_empty());
        }
    }

    #[test]
    fn numeric_strings_parse() {
        let record = json!({ "entry_price": "50000.5", "leverage": 2 });
        assert_eq!(f64_field(&record, "entryPrice"), 50000.5);
        assert_eq!(f64_field(&record, "leverage"), 2.0);
    }

    #[test]
    fn non_array_list_normalizes_to_empty() {
        let payload = json!({ "active_positions": "oops", "inactive_positions": null });
        let ev = positions_event(&payload);
        assert!(ev.active_positions.is_empty());
        assert!(ev.inactive_positions.is_empty());
    }

    #[test]
    fn position_accepts_qty_alias() {
        let camel = json!({ "quantity": 1.5 });
        let abbreviated = json!({ "qty": "1.5" });
        assert_eq!(position(&camel).quantity, 1.5);
        assert_eq!(position(&abbreviated).quantity, 1.5);
    }

    #[test]
    fn positions_event_snake_case_payload() {
        let payload = json!({
            "active_positions": [{
                "symbol": "BTC", "venue": "binance", "side": "long", "qty": 1,
                "entry_price": 50000, "mark_price": 51000, "unrealized_pnl": 1000,
                "leverage": 2, "timestamp": "t1"
            }],
            "inactive_positions": [],
            "total_positions_count": 1,
            "active_positions_count": 1,
            "total_position_value": 51000,
            "total_unrealized_pnl": 1000,
            "timestamp": "t1"
        });
        let ev = positions_event(&payload);
        assert_eq!(ev.active_positions.len(), 1);
        let p = &ev.active_positions[0];
        assert_eq!(p.symbol, "BTC");
        assert_eq!(p.venue, "binance");
        assert_eq!(p.side, "long");
        assert_eq!(p.quantity, 1.0);
        assert_eq!(p.unrealized_pnl, 1000.0);
        assert_eq!(p.liquidation_price, None); // optional, absent on the wire
        assert_eq!(ev.total_positions_count, 1);
        assert_eq!(ev.timestamp, "t1");
    }

    #[test]
    fn equity_event_mixed_casing() {
        let payload = json!({
            "userId": "u1",
            "total_wallet_balance": "1200.75",
            "totalAvailableBalance": 800.25,
            "venue_equities": [
                { "venue": "binance", "walletBalance": 700.0, "bnb_balance_usdt": 12.5 },
                { "venue": "bybit", "wallet_balance": 500.75 }
            ]
        });
        let ev = equity_event(&payload);
        assert_eq!(ev.user_id, "u1");
        assert_eq!(ev.total_wallet_balance, 1200.75);
        assert_eq!(ev.total_available_balance, 800.25);
        assert_eq!(ev.venue_equities.len(), 2);
        assert_eq!(ev.venue_equities[0].bnb_balance_usdt, 12.5);
        assert_eq!(ev.venue_equities[1].wallet_balance, 500.75);
        assert_eq!(ev.venue_equities[1].available_balance, 0.0); // defaulted
    }

    #[test]
    fn input_is_not_mutated() {
        let payload = json!({ "active_positions": [{ "symbol": "BTC" }] });
        let before = payload.clone();
        let _ = positions_event(&payload);
        assert_eq!(payload, before);
    }
}
