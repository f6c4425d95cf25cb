//! Test support — a scripted in-memory transport.
//!
//! [`ChannelTransport`] stands in for the SSE transport in unit and
//! integration tests: each `open()` yields a [`SessionHandle`] through which
//! the test pushes frames, injects read errors, or hangs up. Connect
//! failures are scripted with [`fail_next`](ChannelTransport::fail_next).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::transport::{FrameSource, RawFrame, StreamTransport};

/// Scripted transport: every `open()` produces a fresh session whose handle
/// is delivered on the receiver returned by [`new`](Self::new).
pub struct ChannelTransport {
    sessions_tx: mpsc::UnboundedSender<SessionHandle>,
    fail_next: AtomicU32,
    opened: AtomicU64,
    last_token: Mutex<Option<String>>,
}

impl ChannelTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SessionHandle>) {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            sessions_tx,
            fail_next: AtomicU32::new(0),
            opened: AtomicU64::new(0),
            last_token: Mutex::new(None),
        });
        (transport, sessions_rx)
    }

    /// Make the next `n` open attempts fail.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Number of successful and failed open attempts so far.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Token presented on the most recent open attempt.
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }
}

#[async_trait]
impl StreamTransport for ChannelTransport {
    async fn open(&self, token: Option<&str>) -> Result<Box<dyn FrameSource>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock() = token.map(str::to_string);

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            bail!("scripted connect failure");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver side may be gone if the test finished early; that's fine.
        let _ = self.sessions_tx.send(SessionHandle { tx });
        Ok(Box::new(ChannelSource { rx }))
    }
}

/// Test-side handle to one open session.
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Result<RawFrame>>,
}

impl SessionHandle {
    /// Push one frame. Returns `false` if the client already tore the
    /// session down.
    pub fn send(&self, event: &str, data: &str) -> bool {
        self.tx
            .send(Ok(RawFrame { event: event.to_string(), data: data.to_string() }))
            .is_ok()
    }

    /// Inject a transport read error.
    pub fn send_error(&self, message: &str) -> bool {
        self.tx.send(Err(anyhow::anyhow!("{message}"))).is_ok()
    }

    /// Hang up: the stream ends after any frames already queued.
    pub fn close(self) {}
}

struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<RawFrame>>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Option<Result<RawFrame>> {
        self.rx.recv().await
    }
}
