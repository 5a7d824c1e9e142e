//! Transport-neutral view of the single bidirectional message channel.
//!
//! A [`Connector`] opens channels without blocking; each opened channel
//! reports its lifecycle as [`ChannelEvent`]s on a sender supplied by the
//! caller. Every event is tagged with the [`ChannelId`] of the channel
//! that produced it, so a consumer can stop listening to a channel simply
//! by forgetting its id. Nothing a stale channel emits afterwards can
//! reach the consumer's state.

use std::fmt;

use tokio::sync::mpsc;
use url::Url;

// ── ChannelId ───────────────────────────────────────────────────────

/// Identity of one opened channel. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// Why a channel closed, in the shape browsers report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// `true` when a close handshake completed.
    pub clean: bool,
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// RFC 6455 code for a connection that dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;
    /// RFC 6455 code for a close frame that carried no status.
    pub const NO_STATUS: u16 = 1005;
    pub const NORMAL: u16 = 1000;

    pub fn abnormal() -> Self {
        Self {
            clean: false,
            code: Self::ABNORMAL,
            reason: String::new(),
        }
    }

    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            clean: true,
            code: Self::NORMAL,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clean={}, code={}, reason: {}",
            self.clean, self.code, self.reason
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEventKind {
    /// Handshake finished; the channel accepts sends from now on.
    Opened,
    /// Transport-level failure. Does not by itself close the channel.
    Error(String),
    /// One inbound text frame.
    Message(String),
    /// Terminal event. Emitted exactly once per channel.
    Closed(CloseInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub channel: ChannelId,
    pub kind: ChannelEventKind,
}

impl ChannelEvent {
    pub fn new(channel: ChannelId, kind: ChannelEventKind) -> Self {
        Self { channel, kind }
    }
}

pub type EventSender = mpsc::UnboundedSender<ChannelEvent>;

// ── Traits ──────────────────────────────────────────────────────────

/// Everything a connector needs to open one channel.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub url: Url,
    pub channel: ChannelId,
    /// `true` when this open replaces a channel that dropped.
    pub reconnect: bool,
    pub events: EventSender,
}

/// Handle to one opened channel.
pub trait Channel: Send {
    fn id(&self) -> ChannelId;

    /// `true` between the `Opened` event and the channel closing.
    fn is_open(&self) -> bool;

    /// Queue one text frame. Returns `false`, dropping the frame, when the
    /// channel is not open.
    fn send(&mut self, text: String) -> bool;

    /// Start closing. Idempotent; the eventual `Closed` event is still
    /// emitted.
    fn close(&mut self);
}

/// Factory for channels. `open` must return immediately; the outcome of
/// the handshake is reported through the request's event sender.
pub trait Connector: Send {
    fn open(&mut self, request: OpenRequest) -> Box<dyn Channel>;
}
