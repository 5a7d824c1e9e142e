// ── Wire-to-domain type conversions ──
//
// Bridges `kilnlink_api` payload types and `kilnlink_core::model` domain
// types in both directions. Inbound conversions normalize: a program with
// no name or no steps becomes a valid domain `Program`.

use kilnlink_api::protocol::{
    WireConfiguration, WirePid, WireProgram, WireStatus, WireStep, WireTft, WireWifi,
};

use crate::model::{
    Configuration, DEFAULT_PROGRAM_NAME, PidSettings, Program, Status, Step, TftSettings,
    WifiSettings,
};

// ── Program ────────────────────────────────────────────────────────

impl From<WireStep> for Step {
    fn from(w: WireStep) -> Self {
        Step::new(w.t_start, w.t_end, w.duration)
    }
}

impl From<&Step> for WireStep {
    fn from(s: &Step) -> Self {
        WireStep {
            t_start: s.t_start,
            t_end: s.t_end,
            duration: s.duration,
        }
    }
}

impl From<WireProgram> for Program {
    fn from(w: WireProgram) -> Self {
        let steps = w
            .steps
            .unwrap_or_default()
            .into_iter()
            .map(Step::from)
            .collect();
        Program::new(
            w.name.unwrap_or_else(|| DEFAULT_PROGRAM_NAME.into()),
            steps,
        )
    }
}

impl From<&Program> for WireProgram {
    fn from(p: &Program) -> Self {
        WireProgram {
            name: Some(p.name().to_owned()),
            steps: Some(p.steps().iter().map(WireStep::from).collect()),
        }
    }
}

pub(crate) fn programs_from_wire(list: Vec<WireProgram>) -> Vec<Program> {
    list.into_iter().map(Program::from).collect()
}

pub(crate) fn programs_to_wire(list: &[Program]) -> Vec<WireProgram> {
    list.iter().map(WireProgram::from).collect()
}

// ── Configuration ──────────────────────────────────────────────────

impl From<WireTft> for TftSettings {
    fn from(w: WireTft) -> Self {
        TftSettings {
            poll: w.poll,
            calibration: w.calibration,
        }
    }
}

impl From<WireWifi> for WifiSettings {
    fn from(w: WireWifi) -> Self {
        WifiSettings {
            ssid: w.ssid,
            key: w.key,
            ip: w.ip,
        }
    }
}

impl From<WirePid> for PidSettings {
    fn from(w: WirePid) -> Self {
        PidSettings {
            poll: w.poll,
            kp: w.kp,
            ki: w.ki,
            kd: w.kd,
            tolerance: w.tolerance,
        }
    }
}

impl From<WireConfiguration> for Configuration {
    fn from(w: WireConfiguration) -> Self {
        Configuration {
            tft: w.tft.map(TftSettings::from),
            wifi: w.wifi.map(WifiSettings::from),
            pid: w.pid.map(PidSettings::from),
            programs: w.programs.map(programs_from_wire),
        }
    }
}

impl From<&Configuration> for WireConfiguration {
    fn from(c: &Configuration) -> Self {
        WireConfiguration {
            tft: c.tft.as_ref().map(|t| WireTft {
                poll: t.poll,
                calibration: t.calibration.clone(),
            }),
            wifi: c.wifi.as_ref().map(|w| WireWifi {
                ssid: w.ssid.clone(),
                key: w.key.clone(),
                ip: w.ip.clone(),
            }),
            pid: c.pid.as_ref().map(|p| WirePid {
                poll: p.poll,
                kp: p.kp,
                ki: p.ki,
                kd: p.kd,
                tolerance: p.tolerance,
            }),
            programs: c.programs.as_deref().map(programs_to_wire),
        }
    }
}

// ── Status ─────────────────────────────────────────────────────────

impl From<WireStatus> for Status {
    fn from(w: WireStatus) -> Self {
        Status {
            probe_temp: w.probe_temp,
            ambient_temp: w.ambient_temp,
            setpoint_temp: w.setpoint_temp,
            supply_voltage: w.supply_voltage,
            is_running: w.is_running,
            is_relay_on: w.is_relay_on,
            status_text: w.status_text,
            active_program: w.active_program.map(Program::from),
            active_step: w.active_step,
            elapsed_time: w.elapsed_time,
        }
    }
}
