//! Connection-health state exposed to the UI.

use serde::{Deserialize, Serialize};

/// Connection-health flags driving the "connection lost" banner.
///
/// `is_initialized` becomes true on the *first* connect-attempt outcome
/// (success or failure) and never reverts for the lifetime of the session;
/// only the full session reset on logout clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub is_connected: bool,
    pub is_initialized: bool,
    pub is_authenticated: bool,
    pub last_error: Option<String>,
}
