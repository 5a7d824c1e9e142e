//! Wire envelopes and the closed command/response vocabulary.
//!
//! Every frame on the channel is a JSON text message:
//!
//! ```text
//! request  → { "id": "<command>", "msg"?: <Configuration | Program[] | string> }
//! response ← { "id": "OK" | "ERR" | "STATUS", "details"?, "config"?, "status"?, "programs"? }
//! ```
//!
//! Two firmware generations speak slightly different spellings of the same
//! protocol. [`Dialect`] selects which spelling is *written*; the reader
//! accepts both, so a session never has to guess what the device will
//! send back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::Error;

// ── Dialect ─────────────────────────────────────────────────────────

/// Wire spelling used when encoding envelopes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    /// Long-form ids (`read-config`, `STATUS`) and descriptive field names.
    #[default]
    Canonical,
    /// Short ids (`cfgRD`, `STS`) and abbreviated field names used by
    /// older controller firmware.
    Compact,
}

// ── CommandId ───────────────────────────────────────────────────────

/// The closed set of commands a front end may send to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum CommandId {
    ReadConfig,
    WriteConfig,
    SaveConfig,
    ReadPrograms,
    WritePrograms,
    SavePrograms,
    SelectProgram,
    Start,
    Stop,
}

/// Payload shape carried in the `msg` field for a given command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    Configuration,
    Programs,
    ProgramName,
}

impl CommandId {
    /// Identifier as written on the wire in the given dialect.
    pub const fn wire_name(self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Canonical => self.canonical_name(),
            Dialect::Compact => self.compact_name(),
        }
    }

    /// Resolve a wire identifier written in either dialect.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::iter().find(|id| id.canonical_name() == name || id.compact_name() == name)
    }

    pub const fn payload_kind(self) -> PayloadKind {
        match self {
            Self::WriteConfig => PayloadKind::Configuration,
            Self::WritePrograms => PayloadKind::Programs,
            Self::SelectProgram => PayloadKind::ProgramName,
            Self::ReadConfig
            | Self::SaveConfig
            | Self::ReadPrograms
            | Self::SavePrograms
            | Self::Start
            | Self::Stop => PayloadKind::None,
        }
    }

    const fn canonical_name(self) -> &'static str {
        match self {
            Self::ReadConfig => "read-config",
            Self::WriteConfig => "write-config",
            Self::SaveConfig => "save-config",
            Self::ReadPrograms => "read-programs",
            Self::WritePrograms => "write-programs",
            Self::SavePrograms => "save-programs",
            Self::SelectProgram => "select-program",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    const fn compact_name(self) -> &'static str {
        match self {
            Self::ReadConfig => "cfgRD",
            Self::WriteConfig => "cfgWR",
            Self::SaveConfig => "cfgSV",
            Self::ReadPrograms => "pgmRD",
            Self::WritePrograms => "pgmWR",
            Self::SavePrograms => "pgmSV",
            Self::SelectProgram => "setPG",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

// ── ResponseId ──────────────────────────────────────────────────────

/// Response identifier. Unrecognized ids are preserved rather than
/// rejected so newer firmware can add message kinds without breaking
/// older front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseId {
    Ok,
    Err,
    Status,
    Unknown(String),
}

impl ResponseId {
    pub fn wire_name(&self, dialect: Dialect) -> &str {
        match (self, dialect) {
            (Self::Ok, _) => "OK",
            (Self::Err, _) => "ERR",
            (Self::Status, Dialect::Canonical) => "STATUS",
            (Self::Status, Dialect::Compact) => "STS",
            (Self::Unknown(raw), _) => raw,
        }
    }

    pub fn from_wire(name: &str) -> Self {
        match name {
            "OK" => Self::Ok,
            "ERR" => Self::Err,
            "STATUS" | "STS" => Self::Status,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

// ── Payload types ───────────────────────────────────────────────────
//
// Field names are the canonical spelling; `alias` attributes let the
// reader accept the compact spelling too.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStep {
    pub t_start: f64,
    pub t_end: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireProgram {
    #[serde(default, alias = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Absent on some firmware when a program was created without steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WireStep>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireTft {
    /// Touch polling interval in milliseconds.
    pub poll: f64,
    #[serde(alias = "TFT")]
    pub calibration: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireWifi {
    #[serde(alias = "SSID")]
    pub ssid: String,
    #[serde(alias = "KEY")]
    pub key: String,
    #[serde(default, alias = "IP", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePid {
    /// Control loop interval in milliseconds.
    #[serde(default)]
    pub poll: f64,
    #[serde(alias = "KP")]
    pub kp: f64,
    #[serde(alias = "KI")]
    pub ki: f64,
    #[serde(alias = "KD")]
    pub kd: f64,
    #[serde(default, alias = "TOL", skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireConfiguration {
    #[serde(default, alias = "TFT", skip_serializing_if = "Option::is_none")]
    pub tft: Option<WireTft>,
    #[serde(default, alias = "WiFi", skip_serializing_if = "Option::is_none")]
    pub wifi: Option<WireWifi>,
    #[serde(default, alias = "PID", skip_serializing_if = "Option::is_none")]
    pub pid: Option<WirePid>,
    #[serde(default, alias = "Programs", skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<WireProgram>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStatus {
    #[serde(alias = "tPB")]
    pub probe_temp: f64,
    #[serde(alias = "tAM")]
    pub ambient_temp: f64,
    #[serde(alias = "tSP")]
    pub setpoint_temp: f64,
    #[serde(alias = "U")]
    pub supply_voltage: f64,
    pub is_running: bool,
    pub is_relay_on: bool,
    #[serde(alias = "stsText")]
    pub status_text: String,
    #[serde(alias = "actPgm")]
    pub active_program: Option<WireProgram>,
    #[serde(alias = "actStep")]
    pub active_step: f64,
    #[serde(alias = "tmElapsed")]
    pub elapsed_time: f64,
}

// ── Request ─────────────────────────────────────────────────────────

/// A command envelope, with the payload typed by the command it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ReadConfig,
    WriteConfig(WireConfiguration),
    SaveConfig,
    ReadPrograms,
    WritePrograms(Vec<WireProgram>),
    SavePrograms,
    SelectProgram(String),
    Start,
    Stop,
}

#[derive(Deserialize)]
struct RawRequest {
    id: String,
    #[serde(default)]
    msg: Option<Value>,
}

impl Request {
    pub fn id(&self) -> CommandId {
        match self {
            Self::ReadConfig => CommandId::ReadConfig,
            Self::WriteConfig(_) => CommandId::WriteConfig,
            Self::SaveConfig => CommandId::SaveConfig,
            Self::ReadPrograms => CommandId::ReadPrograms,
            Self::WritePrograms(_) => CommandId::WritePrograms,
            Self::SavePrograms => CommandId::SavePrograms,
            Self::SelectProgram(_) => CommandId::SelectProgram,
            Self::Start => CommandId::Start,
            Self::Stop => CommandId::Stop,
        }
    }

    fn payload(&self) -> Result<Option<Value>, Error> {
        let value = match self {
            Self::WriteConfig(config) => serde_json::to_value(config)?,
            Self::WritePrograms(programs) => serde_json::to_value(programs)?,
            Self::SelectProgram(name) => Value::String(name.clone()),
            Self::ReadConfig
            | Self::SaveConfig
            | Self::ReadPrograms
            | Self::SavePrograms
            | Self::Start
            | Self::Stop => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Serialize to wire text. Payload-less commands omit `msg` entirely.
    pub fn encode(&self, dialect: Dialect) -> Result<String, Error> {
        let mut envelope = Map::new();
        envelope.insert(
            "id".into(),
            Value::String(self.id().wire_name(dialect).to_owned()),
        );
        if let Some(mut msg) = self.payload()? {
            if dialect == Dialect::Compact {
                compact_keys(&mut msg);
            }
            envelope.insert("msg".into(), msg);
        }
        Ok(serde_json::to_string(&Value::Object(envelope))?)
    }

    /// Parse wire text in either dialect, choosing the payload decoder by id.
    pub fn decode(text: &str) -> Result<Self, Error> {
        let raw: RawRequest =
            serde_json::from_str(text).map_err(|e| Error::decode(e.to_string(), text))?;
        let id = CommandId::from_wire(&raw.id)
            .ok_or_else(|| Error::decode(format!("unknown command id '{}'", raw.id), text))?;
        let msg = raw.msg.filter(|v| !v.is_null());

        let request = match id.payload_kind() {
            PayloadKind::Configuration => Self::WriteConfig(payload(id, msg, text)?),
            PayloadKind::Programs => Self::WritePrograms(payload(id, msg, text)?),
            PayloadKind::ProgramName => Self::SelectProgram(payload(id, msg, text)?),
            PayloadKind::None => match id {
                CommandId::ReadConfig => Self::ReadConfig,
                CommandId::SaveConfig => Self::SaveConfig,
                CommandId::ReadPrograms => Self::ReadPrograms,
                CommandId::SavePrograms => Self::SavePrograms,
                CommandId::Start => Self::Start,
                CommandId::Stop => Self::Stop,
                CommandId::WriteConfig | CommandId::WritePrograms | CommandId::SelectProgram => {
                    return Err(Error::decode(format!("'{id}' carries a payload"), text));
                }
            },
        };
        Ok(request)
    }
}

fn payload<T: DeserializeOwned>(id: CommandId, msg: Option<Value>, body: &str) -> Result<T, Error> {
    let msg = msg.ok_or_else(|| Error::decode(format!("'{id}' requires a payload"), body))?;
    serde_json::from_value(msg).map_err(|e| Error::decode(format!("'{id}' payload: {e}"), body))
}

// ── Response ────────────────────────────────────────────────────────

/// A device-to-front-end envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: ResponseId,
    pub details: Option<String>,
    pub config: Option<WireConfiguration>,
    pub status: Option<WireStatus>,
    pub programs: Option<Vec<WireProgram>>,
}

#[derive(Deserialize)]
struct RawResponse {
    id: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    config: Option<WireConfiguration>,
    #[serde(default)]
    status: Option<WireStatus>,
    #[serde(default)]
    programs: Option<Vec<WireProgram>>,
}

impl Response {
    fn bare(id: ResponseId) -> Self {
        Self {
            id,
            details: None,
            config: None,
            status: None,
            programs: None,
        }
    }

    pub fn ok(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::bare(ResponseId::Ok)
        }
    }

    pub fn err(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::bare(ResponseId::Err)
        }
    }

    pub fn status(status: WireStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::bare(ResponseId::Status)
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: WireConfiguration) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_programs(mut self, programs: Vec<WireProgram>) -> Self {
        self.programs = Some(programs);
        self
    }

    /// Parse wire text in either dialect.
    ///
    /// Never panics: malformed JSON, a missing `id` or a structurally
    /// invalid payload all come back as [`Error::Decode`].
    pub fn decode(text: &str) -> Result<Self, Error> {
        let raw: RawResponse =
            serde_json::from_str(text).map_err(|e| Error::decode(e.to_string(), text))?;
        Ok(Self {
            id: ResponseId::from_wire(&raw.id),
            details: raw.details,
            config: raw.config,
            status: raw.status,
            programs: raw.programs,
        })
    }

    /// Serialize to wire text. Used by device simulators and tests.
    pub fn encode(&self, dialect: Dialect) -> Result<String, Error> {
        let mut envelope = Map::new();
        envelope.insert("id".into(), Value::String(self.id.wire_name(dialect).to_owned()));
        if let Some(details) = &self.details {
            envelope.insert("details".into(), Value::String(details.clone()));
        }
        let payloads = [
            ("config", self.config.as_ref().map(serde_json::to_value).transpose()?),
            ("status", self.status.as_ref().map(serde_json::to_value).transpose()?),
            ("programs", self.programs.as_ref().map(serde_json::to_value).transpose()?),
        ];
        for (key, value) in payloads {
            if let Some(mut value) = value {
                if dialect == Dialect::Compact {
                    compact_keys(&mut value);
                }
                envelope.insert(key.into(), value);
            }
        }
        Ok(serde_json::to_string(&Value::Object(envelope))?)
    }
}

// ── Compact spelling ────────────────────────────────────────────────

/// Canonical → compact field names. Keys are unique across all payload
/// shapes, so a single flat table is enough.
const COMPACT_KEYS: &[(&str, &str)] = &[
    ("tft", "TFT"),
    ("calibration", "TFT"),
    ("wifi", "WiFi"),
    ("ssid", "SSID"),
    ("key", "KEY"),
    ("ip", "IP"),
    ("pid", "PID"),
    ("kp", "KP"),
    ("ki", "KI"),
    ("kd", "KD"),
    ("tolerance", "TOL"),
    ("programs", "Programs"),
    ("name", "Name"),
    ("probeTemp", "tPB"),
    ("ambientTemp", "tAM"),
    ("setpointTemp", "tSP"),
    ("supplyVoltage", "U"),
    ("statusText", "stsText"),
    ("activeProgram", "actPgm"),
    ("activeStep", "actStep"),
    ("elapsedTime", "tmElapsed"),
];

/// Rewrite object keys in place, recursively. Values are never touched.
fn compact_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let renamed: Map<String, Value> = std::mem::take(map)
                .into_iter()
                .map(|(key, mut inner)| {
                    compact_keys(&mut inner);
                    let key = COMPACT_KEYS
                        .iter()
                        .find(|(canonical, _)| *canonical == key)
                        .map_or(key, |(_, compact)| (*compact).to_owned());
                    (key, inner)
                })
                .collect();
            *map = renamed;
        }
        Value::Array(items) => items.iter_mut().for_each(compact_keys),
        _ => {}
    }
}

// ── Tests ───────────────────────────────────────────────────────────
