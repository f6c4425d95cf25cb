//! Connection slice reducers.
//!
//! The slice itself is [`tc_core::ConnectionState`]; these functions encode
//! the flag transitions so the invariants live in one place:
//!
//! - `is_initialized` is set by the first connect-attempt outcome and only
//!   cleared by the full session reset.
//! - A successful connection clears `last_error`.

use tc_core::ConnectionState;

/// Record a connect-attempt outcome or an observed liveness transition.
pub(crate) fn apply_connected(state: &mut ConnectionState, connected: bool) {
    state.is_initialized = true;
    state.is_connected = connected;
    if connected {
        state.last_error = None;
    }
}

/// Record a connection error message. Does not touch `is_connected` — the
/// caller decides whether the transport is down.
pub(crate) fn apply_error(state: &mut ConnectionState, message: String) {
    state.last_error = Some(message);
}

/// Mirror the authentication flag from the auth channel.
pub(crate) fn apply_authenticated(state: &mut ConnectionState, authenticated: bool) {
    state.is_authenticated = authenticated;
}
