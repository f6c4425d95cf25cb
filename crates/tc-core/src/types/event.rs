//! Stream event types delivered over the server-push connection.
//!
//! Each inbound frame is parsed and normalized into one [`StreamEvent`]
//! variant. Downstream code pattern-matches exhaustively on the variant —
//! dynamic key probing stops at the normalization boundary.

use serde::{Deserialize, Serialize};

use super::equity::EquityEvent;
use super::position::PositionsEvent;

/// A typed event received on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Liveness marker; distinguishes the initial connect ack from
    /// steady-state pings.
    Ping(PingEvent),

    /// Complete position snapshot (active and inactive lists).
    Positions(PositionsEvent),

    /// Per-venue balance snapshot with portfolio-wide totals.
    Equity(EquityEvent),

    /// Secondary liveness marker carrying no domain data.
    Heartbeat(HeartbeatEvent),

    /// A market price tick.
    MarketData(MarketTick),
}

impl StreamEvent {
    /// Returns the tag-only kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ping(_) => EventKind::Ping,
            Self::Positions(_) => EventKind::Positions,
            Self::Equity(_) => EventKind::Equity,
            Self::Heartbeat(_) => EventKind::Heartbeat,
            Self::MarketData(_) => EventKind::MarketData,
        }
    }
}

/// Tag-only companion of [`StreamEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Ping,
    Positions,
    Equity,
    Heartbeat,
    MarketData,
}

impl EventKind {
    /// Wire name of this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Positions => "positions",
            Self::Equity => "equity",
            Self::Heartbeat => "heartbeat",
            Self::MarketData => "market_data",
        }
    }

    /// Parse a wire event name. Returns `None` for unknown types.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ping" => Some(Self::Ping),
            "positions" => Some(Self::Positions),
            "equity" => Some(Self::Equity),
            "heartbeat" => Some(Self::Heartbeat),
            "market_data" => Some(Self::MarketData),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `ping` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingEvent {
    /// Server liveness message (e.g. `"connected"`, `"alive"`).
    pub message: String,
    /// Set on the first ping after the transport is established.
    pub connected: bool,
}

impl PingEvent {
    /// True if this ping is the initial "freshly connected" acknowledgment
    /// rather than a steady-state keep-alive.
    pub fn is_connect_ack(&self) -> bool {
        self.connected || self.message == "connected"
    }
}

/// Payload of a `heartbeat` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatEvent {
    pub timestamp: String,
}

/// Payload of a `market_data` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTick {
    pub symbol: String,
    pub price: f64,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        for kind in [
            EventKind::Ping,
            EventKind::Positions,
            EventKind::Equity,
            EventKind::Heartbeat,
            EventKind::MarketData,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("order_update"), None);
    }

    #[test]
    fn connect_ack_detection() {
        let ack = PingEvent { message: "connected".into(), connected: false };
        assert!(ack.is_connect_ack());
        let flagged = PingEvent { message: String::new(), connected: true };
        assert!(flagged.is_connect_ack());
        let steady = PingEvent { message: "alive".into(), connected: false };
        assert!(!steady.is_connect_ack());
    }
}
