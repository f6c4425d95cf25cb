//! # tc-stream
//!
//! Event-stream client for the trade-companion sync engine.
//!
//! ## Architecture
//!
//! ```text
//! supervisor ──► client.connect() ──► transport (SSE over HTTP)
//!                      │                    │
//!                      │              raw frames
//!                      │                    ▼
//!                      │            parser + normalization
//!                      │                    ▼
//!                      │            subscription registry
//!                      │                    ▼
//!                      └──────────── dispatch bridge ──► tc-store
//! ```
//!
//! - [`transport`] — `StreamTransport`/`FrameSource` seam + SSE implementation
//! - [`parser`] — wire frames to typed [`tc_core::StreamEvent`]s
//! - [`registry`] — event-kind to callback fan-out
//! - [`client`] — connection lifecycle and the serial frame loop
//! - [`bridge`] — typed events to store commands
//! - [`supervisor`] — auth-driven lifecycle, liveness checks, reconnects
//! - [`testing`] — scripted in-memory transport for tests

pub mod bridge;
pub mod client;
pub mod parser;
pub mod registry;
pub mod supervisor;
pub mod testing;
pub mod transport;

pub use bridge::DispatchBridge;
pub use client::{EventStreamClient, StreamDebugInfo};
pub use registry::{Subscription, SubscriptionRegistry};
pub use supervisor::{ConnectionSupervisor, SupervisorConfig};
pub use transport::{FrameSource, RawFrame, SseTransport, StreamTransport};
