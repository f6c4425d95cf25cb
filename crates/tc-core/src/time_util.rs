//! Time utilities.
//!
//! Wall-clock timestamps for `last_updated` store fields and a monotonic
//! clock for staleness checks that must not jump with wall-clock changes.

use std::sync::LazyLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Current wall-clock time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Monotonic clock in **microseconds** — for elapsed-time measurements
/// without wall-clock jumps.
#[inline]
pub fn monotonic_us() -> u64 {
    static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);
    ORIGIN.elapsed().as_micros() as u64
}
