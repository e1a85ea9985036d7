//! Persisted dashboard record and the entities it holds
//!
//! The record is the only thing written to storage. It always serializes the
//! same five fields, in this order:
//!
//! ```text
//! { "beacons": [{x,y,t,phase}], "mood": n, "drift": n,
//!   "agents": [{name,role,id}], "automations": [{name,type,data,id,_last?}] }
//! ```
//!
//! Reading goes through [`Record::from_json_lenient`] (storage: a bad field
//! falls back to its default) or [`Record::from_json_strict`] (import: a bad
//! field rejects the whole document).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::mood::{DRIFT, MOOD};

/// Mood of a fresh record
pub const DEFAULT_MOOD: f64 = 0.55;

/// Drift of a fresh record
pub const DEFAULT_DRIFT: f64 = 0.25;

/// A user-placed pulsing node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub x: f64,
    pub y: f64,
    /// Accumulated age in simulated seconds
    #[serde(default)]
    pub t: f64,
    /// Pulse phase offset in radians
    #[serde(default)]
    pub phase: f64,
}

impl Beacon {
    pub fn new(x: f64, y: f64, phase: f64) -> Self {
        Self { x, y, t: 0.0, phase }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.t.is_finite() && self.phase.is_finite()
    }
}

/// A named helper shown on the agents view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub role: String,
    /// Creation time in epoch milliseconds
    #[serde(default)]
    pub id: i64,
}

/// What makes an automation fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AutomationKind {
    /// Fires on an interval parsed from the automation's data (`10s`, `1m`)
    #[default]
    Timer,
    /// Fires every 30 seconds while at least one beacon exists
    Beacon,
    /// Never fires on its own
    Manual,
}

impl AutomationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationKind::Timer => "timer",
            AutomationKind::Beacon => "beacon",
            AutomationKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AutomationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined rule evaluated by the automation sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automation {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AutomationKind,
    /// Free-text configuration (the interval for timers)
    #[serde(default)]
    pub data: String,
    /// Creation time in epoch milliseconds
    #[serde(default)]
    pub id: i64,
    /// Last time this automation fired, in epoch milliseconds
    #[serde(rename = "_last", default, skip_serializing_if = "Option::is_none")]
    pub last_fired: Option<i64>,
}

/// The persisted dashboard state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub beacons: Vec<Beacon>,
    pub mood: f64,
    pub drift: f64,
    pub agents: Vec<Agent>,
    pub automations: Vec<Automation>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            beacons: Vec::new(),
            mood: DEFAULT_MOOD,
            drift: DEFAULT_DRIFT,
            agents: Vec::new(),
            automations: Vec::new(),
        }
    }
}

/// Why a document could not be turned into a [`Record`]
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object at the top level")]
    NotAnObject,
    #[error("field '{field}': {message}")]
    Field { field: &'static str, message: String },
}

impl Record {
    /// Parse stored text, replacing every unreadable field with its default.
    ///
    /// Never fails. The returned strings describe each fallback that was taken.
    pub fn from_json_lenient(text: &str) -> (Self, Vec<String>) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return (Self::default(), vec![format!("invalid JSON: {}", e)]),
        };
        let Value::Object(obj) = value else {
            return (Self::default(), vec![RecordError::NotAnObject.to_string()]);
        };

        let mut warnings = Vec::new();
        let merged = merge_fields(&obj, |e| {
            warnings.push(e.to_string());
            Ok(())
        });
        // The lenient callback never rejects, so merging cannot fail.
        (merged.unwrap_or_default(), warnings)
    }

    /// Parse imported text; any malformed field rejects the whole document.
    ///
    /// Missing fields still take their defaults and unknown fields are ignored.
    pub fn from_json_strict(text: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(obj) = value else {
            return Err(RecordError::NotAnObject);
        };
        merge_fields(&obj, Err)
    }

    /// Compact serialization used for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Two-space indented serialization used for export
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Overlay the five known fields of `obj` on a default record.
///
/// `reject` decides what happens to a bad field: returning `Ok` keeps the
/// default for that field, returning `Err` aborts the merge.
fn merge_fields<F>(obj: &Map<String, Value>, mut reject: F) -> Result<Record, RecordError>
where
    F: FnMut(RecordError) -> Result<(), RecordError>,
{
    let mut record = Record::default();

    overlay(obj, "beacons", &mut record.beacons, &mut reject, |beacons: Vec<Beacon>| {
        match beacons.iter().position(|b| !b.is_finite()) {
            Some(i) => Err(format!("beacon {} has a non-finite value", i)),
            None => Ok(beacons),
        }
    })?;
    overlay(obj, "mood", &mut record.mood, &mut reject, |m: f64| {
        if m.is_finite() {
            Ok(MOOD.clamp(m))
        } else {
            Err("must be a finite number".to_string())
        }
    })?;
    overlay(obj, "drift", &mut record.drift, &mut reject, |d: f64| {
        if d.is_finite() {
            Ok(DRIFT.clamp(d))
        } else {
            Err("must be a finite number".to_string())
        }
    })?;
    overlay(obj, "agents", &mut record.agents, &mut reject, |agents: Vec<Agent>| {
        match agents.iter().position(|a| a.name.trim().is_empty()) {
            Some(i) => Err(format!("agent {} has an empty name", i)),
            None => Ok(agents),
        }
    })?;
    overlay(obj, "automations", &mut record.automations, &mut reject, |autos: Vec<Automation>| {
        match autos.iter().position(|a| a.name.trim().is_empty()) {
            Some(i) => Err(format!("automation {} has an empty name", i)),
            None => Ok(autos),
        }
    })?;

    Ok(record)
}

/// Decode and validate one field into `slot`. Absent and `null` fields leave
/// the slot untouched.
fn overlay<T, F, V>(
    obj: &Map<String, Value>,
    field: &'static str,
    slot: &mut T,
    reject: &mut F,
    validate: V,
) -> Result<(), RecordError>
where
    T: DeserializeOwned,
    F: FnMut(RecordError) -> Result<(), RecordError>,
    V: FnOnce(T) -> Result<T, String>,
{
    let raw = match obj.get(field) {
        None | Some(Value::Null) => return Ok(()),
        Some(v) => v,
    };

    let decoded = T::deserialize(raw).map_err(|e| e.to_string()).and_then(validate);
    match decoded {
        Ok(v) => {
            *slot = v;
            Ok(())
        }
        Err(message) => reject(RecordError::Field { field, message }),
    }
}
