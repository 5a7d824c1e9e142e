// ── Live telemetry snapshot ──

use serde::{Deserialize, Serialize};

use super::program::{Program, Step};

/// Telemetry pushed by the device. Only ever replaced as a whole; the one
/// local write is `status_text`, used for connection and precondition
/// messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    pub probe_temp: f64,
    pub ambient_temp: f64,
    pub setpoint_temp: f64,
    pub supply_voltage: f64,
    pub is_running: bool,
    pub is_relay_on: bool,
    pub status_text: String,
    /// Device-authoritative; changes only when the device says so.
    pub active_program: Option<Program>,
    /// Index into `active_program`'s steps.
    pub active_step: f64,
    /// Seconds since the program started.
    pub elapsed_time: f64,
}

impl Status {
    /// The step the device is currently executing, if it is a valid index.
    pub fn current_step(&self) -> Option<&Step> {
        let program = self.active_program.as_ref()?;
        program.steps().get(self.step_index()?)
    }

    /// `active_step` as an index, or `None` when it is negative, fractional
    /// or not finite.
    pub fn step_index(&self) -> Option<usize> {
        let step = self.active_step;
        let whole = step.is_finite() && step.fract() == 0.0;
        if !whole || step < 0.0 || step > f64::from(u32::MAX) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        let index = step as usize;
        Some(index)
    }
}
