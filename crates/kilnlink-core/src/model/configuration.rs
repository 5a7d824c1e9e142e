// ── Device configuration domain types ──

use serde::{Deserialize, Serialize};

use super::program::Program;

/// Touch screen polling and calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TftSettings {
    /// Polling interval in milliseconds.
    pub poll: f64,
    pub calibration: Vec<f64>,
}

/// Network the device joins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiSettings {
    pub ssid: String,
    /// Pre-shared key.
    pub key: String,
    /// Address currently assigned to the device, reported read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Temperature control loop tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PidSettings {
    /// Control loop interval in milliseconds.
    pub poll: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Temperature measurement tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

/// Everything the device reports from `read-config`.
///
/// Every block is optional: an empty configuration simply means the device
/// has not reported its settings yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tft: Option<TftSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<WifiSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<PidSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<Program>>,
}

impl Configuration {
    pub fn is_empty(&self) -> bool {
        self.tft.is_none() && self.wifi.is_none() && self.pid.is_none() && self.programs.is_none()
    }
}
