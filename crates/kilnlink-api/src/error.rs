use thiserror::Error;

/// Top-level error type for the `kilnlink-api` crate.
///
/// Covers the codec and the channel transport. `kilnlink-core` maps these
/// into user-facing diagnostics; none of them ever reach the caller of a
/// session operation.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Device address does not form a valid WebSocket URL.
    #[error("Invalid device URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Codec ───────────────────────────────────────────────────────
    /// Incoming text is not a well-formed envelope, with the raw body for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },

    /// Outgoing envelope could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn decode(message: impl Into<String>, body: &str) -> Self {
        Self::Decode {
            message: message.into(),
            body: body.to_owned(),
        }
    }
}
