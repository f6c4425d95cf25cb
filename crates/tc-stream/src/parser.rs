//! Frame parser — wire frames to typed stream events.
//!
//! Applies the normalization stage at the parse boundary: past this point
//! everything is a typed [`StreamEvent`] and no code probes raw JSON keys.
//!
//! Unparseable frames are dropped and logged, never propagated — a bad
//! frame must not take the stream down.

use tc_core::{EventKind, StreamEvent, normalize};
use tracing::{debug, warn};

use crate::transport::RawFrame;

/// Parse one frame into a typed event.
///
/// Returns `None` for malformed payloads and unknown event types; both are
/// logged and the stream stays alive.
pub fn parse_frame(frame: &RawFrame) -> Option<StreamEvent> {
    let payload: serde_json::Value = if frame.data.is_empty() {
        // Bare liveness frames carry no payload; normalization defaults fill in.
        serde_json::Value::Null
    } else {
        match serde_json::from_str(&frame.data) {
            Ok(v) => v,
            Err(e) => {
                warn!(event = %frame.event, error = %e, "dropping malformed frame");
                return None;
            }
        }
    };

    // The discriminator is the frame's event name. Unnamed frames fall back
    // to a `type` field inside the payload, with the actual payload nested
    // under `data`.
    let (kind_name, payload) = if frame.event.is_empty() || frame.event == "message" {
        let name = normalize::str_field(&payload, "type");
        let inner = match normalize::field(&payload, "data").cloned() {
            Some(v) => v,
            None => payload,
        };
        (name, inner)
    } else {
        (frame.event.clone(), payload)
    };

    let Some(kind) = EventKind::parse(&kind_name) else {
        debug!(event = %kind_name, "ignoring unknown event type");
        return None;
    };

    Some(match kind {
        EventKind::Ping => StreamEvent::Ping(normalize::ping_event(&payload)),
        EventKind::Positions => StreamEvent::Positions(normalize::positions_event(&payload)),
        EventKind::Equity => StreamEvent::Equity(normalize::equity_event(&payload)),
        EventKind::Heartbeat => StreamEvent::Heartbeat(normalize::heartbeat_event(&payload)),
        EventKind::MarketData => StreamEvent::MarketData(normalize::market_tick(&payload)),
    })
}
