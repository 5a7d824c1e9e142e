// ── Core error types ──
//
// User-facing errors from kilnlink-core. Session operations never return
// these: channel trouble lands in `Status::status_text` instead. They come
// from configuration validation, detaching values, and the front-end
// helpers that wait for the device to answer.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device disconnected")]
    ControllerDisconnected,

    #[error("Device did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Program not found: {name}")]
    ProgramNotFound { name: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_secs: duration.as_secs(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<kilnlink_api::Error> for CoreError {
    fn from(err: kilnlink_api::Error) -> Self {
        match err {
            kilnlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device address: {e}"),
            },
            kilnlink_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            kilnlink_api::Error::Decode { message, body: _ } => {
                CoreError::Internal(format!("Decode error: {message}"))
            }
            kilnlink_api::Error::Encode(e) => CoreError::Internal(format!("Encode error: {e}")),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("Serialization error: {err}"))
    }
}
