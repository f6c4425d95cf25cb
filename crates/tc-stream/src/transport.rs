//! Stream transport — the seam between the client and the wire.
//!
//! The client only sees two traits: [`StreamTransport`] (open a connection
//! with the current session credential) and [`FrameSource`] (pull decoded
//! frames until the stream ends). The production implementation,
//! [`SseTransport`], reads a long-lived `text/event-stream` HTTP response
//! via `reqwest`; tests substitute a scripted in-memory transport.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

/// One decoded frame from the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Event-type discriminator (the SSE `event:` field; empty if unnamed).
    pub event: String,
    /// Frame payload (SSE `data:` lines joined with `\n`).
    pub data: String,
}

/// A live, open frame stream.
#[async_trait]
pub trait FrameSource: Send {
    /// Pull the next frame. `None` when the stream has ended; `Err` for a
    /// transport read failure (the client treats both as stream end).
    async fn next_frame(&mut self) -> Option<Result<RawFrame>>;
}

/// Factory for opening the underlying server-push connection.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Establish one connection authenticated with the given session token.
    async fn open(&self, token: Option<&str>) -> Result<Box<dyn FrameSource>>;
}

// ---------------------------------------------------------------------------
// SSE framing
// ---------------------------------------------------------------------------

/// Incremental `text/event-stream` decoder.
///
/// Feed arbitrary byte chunks with [`push`](Self::push); complete frames come
/// out as they are terminated by a blank line. Handles `event:`/`data:`
/// fields, multi-line `data:` (joined with `\n`), `:` comment lines (used by
/// servers as keep-alive padding), and CRLF line endings. `id:` and `retry:`
/// fields are accepted and ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            if let Some(frame) = self.push_line(line.trim_end_matches(['\n', '\r'])) {
                frames.push(frame);
            }
        }
        frames
    }

    fn push_line(&mut self, line: &str) -> Option<RawFrame> {
        if line.is_empty() {
            // Blank line terminates a frame, if one has accumulated.
            if self.event.is_empty() && self.data.is_empty() {
                return None;
            }
            let frame = RawFrame {
                event: std::mem::take(&mut self.event),
                data: self.data.join("\n"),
            };
            self.data.clear();
            return Some(frame);
        }
        if line.starts_with(':') {
            return None; // comment / keep-alive padding
        }
        let (name, value) = match line.split_once(':') {
            Some((n, v)) => (n, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match name {
            "event" => self.event = value.to_string(),
            "data" => self.data.push(value.to_string()),
            _ => {} // id / retry — unused
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SseTransport — production implementation over reqwest
// ---------------------------------------------------------------------------

/// Server-push transport reading a long-lived `text/event-stream` response.
pub struct SseTransport {
    http: reqwest::Client,
    url: String,
}

impl SseTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn open(&self, token: Option<&str>) -> Result<Box<dyn FrameSource>> {
        let mut request = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("event stream request failed")?
            .error_for_status()
            .context("event stream rejected")?;

        Ok(Box::new(SseFrameSource {
            body: response.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }))
    }
}

struct SseFrameSource {
    body: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<RawFrame>,
}

#[async_trait]
impl FrameSource for SseFrameSource {
    async fn next_frame(&mut self) -> Option<Result<RawFrame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    return Some(Err(anyhow::Error::new(e).context("event stream read failed")));
                }
                None => return None,
            }
        }
    }
}
