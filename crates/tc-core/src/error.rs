//! Typed error definitions for the trade-companion sync engine.
//!
//! Provides [`TcError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.
//!
//! None of these errors cross the public boundary of the stream client or
//! supervisor — failures there are reported as `bool` returns and
//! store-visible connection state.

use thiserror::Error;

/// Domain-specific errors for the trade-companion sync engine.
#[derive(Debug, Error)]
pub enum TcError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Stream transport establishment or read error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Frame decoding or payload parsing error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing or rejected session credential.
    #[error("auth error: {0}")]
    Auth(String),
}
