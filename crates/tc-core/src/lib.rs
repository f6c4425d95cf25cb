//! # tc-core
//!
//! Core crate for the trade-companion sync engine, providing:
//!
//! - **Types** (`types`) — stream events, positions, equity, connection state
//! - **Normalization** (`normalize`) — wire-format field normalization
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — domain-specific `TcError` via thiserror
//! - **Time utilities** (`time_util`) — epoch and monotonic timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
