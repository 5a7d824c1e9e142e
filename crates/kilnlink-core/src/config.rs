// ── Runtime session configuration ──
//
// Describes how to reach one device. Never touches disk; the CLI builds a
// `SessionConfig` from its profile and hands it in.

use std::time::Duration;

use url::Url;

use kilnlink_api::{Dialect, device_url};

use crate::error::CoreError;

/// Configuration for talking to a single controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Device address, `host` or `host:port`.
    pub host: String,
    /// Wire spelling for outgoing requests.
    pub dialect: Dialect,
    /// Pause before redialing after the channel drops.
    pub redial_delay: Duration,
    /// Bound for the front-end "wait for the device" helpers.
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// `ws://<host>/ws`, or a config error if the host is unusable.
    pub fn ws_url(&self) -> Result<Url, CoreError> {
        Ok(device_url(&self.host)?)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            dialect: Dialect::default(),
            redial_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}
