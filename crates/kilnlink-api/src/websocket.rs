//! WebSocket channel to a kiln controller.
//!
//! Each [`WsConnector::open`] spawns one background task that performs the
//! handshake and then shuttles frames in both directions until the socket
//! drops or the channel is closed locally. The task reports what happens
//! as [`ChannelEvent`]s. It never reconnects on its own; deciding whether
//! to open a replacement channel is the session's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use kilnlink_api::{ChannelId, Connector, OpenRequest, WsConnector, device_url};
//! use tokio::sync::mpsc;
//!
//! let (events, mut rx) = mpsc::unbounded_channel();
//! let mut connector = WsConnector::default();
//! let mut channel = connector.open(OpenRequest {
//!     url: device_url("192.168.1.50")?,
//!     channel: ChannelId::new(1),
//!     reconnect: false,
//!     events,
//! });
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{}: {:?}", event.channel, event.kind);
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::channel::{
    Channel, ChannelEvent, ChannelEventKind, ChannelId, CloseInfo, Connector, EventSender,
    OpenRequest,
};
use crate::error::Error;

/// Path the controller firmware serves its socket on.
const DEVICE_WS_PATH: &str = "/ws";

/// Build `ws://<host>/ws` for a device address (`host` or `host:port`).
pub fn device_url(host: &str) -> Result<Url, Error> {
    let host = host.trim();
    if host.is_empty() || host.contains('/') {
        return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
    }
    Ok(Url::parse(&format!("ws://{host}{DEVICE_WS_PATH}"))?)
}

// ── WsConnector ─────────────────────────────────────────────────────

/// Opens WebSocket channels on the ambient Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    /// Pause before dialing when the open replaces a dropped channel.
    /// Keeps an unreachable device from turning the session into a busy loop.
    redial_delay: Duration,
}

impl WsConnector {
    pub fn new(redial_delay: Duration) -> Self {
        Self { redial_delay }
    }

    pub fn redial_delay(&self) -> Duration {
        self.redial_delay
    }
}

impl Connector for WsConnector {
    fn open(&mut self, request: OpenRequest) -> Box<dyn Channel> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        let delay = if request.reconnect {
            self.redial_delay
        } else {
            Duration::ZERO
        };

        let id = request.channel;
        tokio::spawn(channel_task(
            request,
            delay,
            outgoing_rx,
            Arc::clone(&open),
            cancel.clone(),
        ));

        Box::new(WsChannel {
            id,
            outgoing_tx,
            open,
            cancel,
        })
    }
}

// ── WsChannel ───────────────────────────────────────────────────────

struct WsChannel {
    id: ChannelId,
    outgoing_tx: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Channel for WsChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn send(&mut self, text: String) -> bool {
        self.is_open() && self.outgoing_tx.send(text).is_ok()
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::Release);
        self.cancel.cancel();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Single channel lifecycle ────────────────────────────────────────

/// Dial, then pump frames until the socket drops or the channel is cancelled.
/// Always finishes with exactly one `Closed` event.
async fn channel_task(
    request: OpenRequest,
    delay: Duration,
    mut outgoing_rx: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let OpenRequest {
        url,
        channel,
        events,
        ..
    } = request;

    let close = run_channel(&url, channel, &events, delay, &mut outgoing_rx, &open, &cancel).await;

    open.store(false, Ordering::Release);
    tracing::debug!(%channel, %close, "WebSocket channel finished");
    emit(&events, channel, ChannelEventKind::Closed(close));
}

async fn run_channel(
    url: &Url,
    channel: ChannelId,
    events: &EventSender,
    delay: Duration,
    outgoing_rx: &mut mpsc::UnboundedReceiver<String>,
    open: &AtomicBool,
    cancel: &CancellationToken,
) -> CloseInfo {
    if !delay.is_zero() {
        tracing::debug!(%channel, ?delay, "Waiting before redial");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return CloseInfo::normal("closed before connect"),
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!(%channel, url = %url, "Connecting to device WebSocket");

    let connected = tokio::select! {
        biased;
        () = cancel.cancelled() => return CloseInfo::normal("closed before connect"),
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            let err = Error::WebSocketConnect(e.to_string());
            tracing::warn!(%channel, error = %err, "WebSocket handshake failed");
            emit(events, channel, ChannelEventKind::Error(err.to_string()));
            return CloseInfo::abnormal();
        }
    };

    open.store(true, Ordering::Release);
    tracing::info!(%channel, "WebSocket connected");
    emit(events, channel, ChannelEventKind::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort: the peer may already be gone.
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return CloseInfo::normal("closed by client");
            }
            outgoing = outgoing_rx.recv() => {
                let Some(text) = outgoing else {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return CloseInfo::normal("channel handle dropped");
                };
                if let Err(e) = write.send(tungstenite::Message::text(text)).await {
                    emit(events, channel, ChannelEventKind::Error(e.to_string()));
                    return CloseInfo::abnormal();
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        emit(events, channel, ChannelEventKind::Message(text.as_str().to_owned()));
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!(%channel, "WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        return close_from_frame(frame.as_ref());
                    }
                    Some(Err(e)) => {
                        let err = Error::WebSocketConnect(e.to_string());
                        emit(events, channel, ChannelEventKind::Error(err.to_string()));
                        return CloseInfo::abnormal();
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!(%channel, "WebSocket stream ended");
                        return CloseInfo::abnormal();
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

fn close_from_frame(frame: Option<&tungstenite::protocol::CloseFrame>) -> CloseInfo {
    match frame {
        Some(cf) => {
            tracing::info!(code = %cf.code, reason = %cf.reason, "WebSocket close frame received");
            CloseInfo {
                clean: true,
                code: u16::from(cf.code),
                reason: cf.reason.as_str().to_owned(),
            }
        }
        None => {
            tracing::info!("WebSocket close frame received (no payload)");
            CloseInfo {
                clean: true,
                code: CloseInfo::NO_STATUS,
                reason: String::new(),
            }
        }
    }
}

fn emit(events: &EventSender, channel: ChannelId, kind: ChannelEventKind) {
    // Ignore send errors -- the session has gone away.
    let _ = events.send(ChannelEvent::new(channel, kind));
}

// ── Tests ───────────────────────────────────────────────────────────
