// ── Device acknowledgements ──

use serde::{Deserialize, Serialize};

/// The device's answer to a command: an `OK` or `ERR` envelope with its
/// details line. Telemetry pushes never produce one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    pub details: String,
}

impl Reply {
    pub fn ok(details: impl Into<String>) -> Self {
        Self {
            ok: true,
            details: details.into(),
        }
    }

    pub fn err(details: impl Into<String>) -> Self {
        Self {
            ok: false,
            details: details.into(),
        }
    }
}
