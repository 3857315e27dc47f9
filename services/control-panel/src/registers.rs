//! Register values, the panel snapshot and display formatting

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Precision used for keys without an entry in the display table
pub const DEFAULT_PRECISION: usize = 3;

/// Value held by a single register
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Boolean(bool),
    Numeric(f64),
}

impl RegisterValue {
    pub fn kind(&self) -> RegisterKind {
        match self {
            RegisterValue::Boolean(_) => RegisterKind::Boolean,
            RegisterValue::Numeric(_) => RegisterKind::Numeric,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RegisterValue::Boolean(b) => Some(*b),
            RegisterValue::Numeric(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RegisterValue::Boolean(_) => None,
            RegisterValue::Numeric(n) => Some(*n),
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(RegisterValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(RegisterValue::Numeric),
            _ => None,
        }
    }
}

/// Type tag sent alongside register writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Boolean,
    Numeric,
}

impl RegisterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterKind::Boolean => "boolean",
            RegisterKind::Numeric => "numeric",
        }
    }
}

/// A register the panel knows how to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub key: &'static str,
    pub kind: RegisterKind,
}

const fn boolean(key: &'static str) -> RegisterSpec {
    RegisterSpec {
        key,
        kind: RegisterKind::Boolean,
    }
}

const fn numeric(key: &'static str) -> RegisterSpec {
    RegisterSpec {
        key,
        kind: RegisterKind::Numeric,
    }
}

/// Every register exposed by the backend
pub const REGISTERS: &[RegisterSpec] = &[
    boolean("direction"),
    boolean("move"),
    boolean("emergency"),
    boolean("manual"),
    boolean("esp32_modbus"),
    boolean("esp32_sim_internet"),
    numeric("reference_speed"),
    numeric("actual_speed"),
    numeric("motor1_temp"),
    numeric("motor2_temp"),
    numeric("motor1_current"),
    numeric("motor2_current"),
    numeric("total_current"),
    numeric("distance"),
];

/// Registers that drive the connected/disconnected indicators
pub const LINK_REGISTERS: &[&str] = &["esp32_modbus", "esp32_sim_internet"];

pub const DIRECTION_REGISTER: &str = "direction";
pub const MOVE_REGISTER: &str = "move";

/// Look up the kind of a known register
pub fn register_kind(key: &str) -> Option<RegisterKind> {
    REGISTERS.iter().find(|r| r.key == key).map(|r| r.kind)
}

/// Complete set of register values from one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelSnapshot {
    values: BTreeMap<String, RegisterValue>,
}

impl PanelSnapshot {
    /// Parse the flat JSON object returned by `/api/get_registers`.
    ///
    /// Entries that are neither booleans nor numbers are dropped.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(body)?;
        let mut values = BTreeMap::new();
        for (key, value) in object {
            match RegisterValue::from_json(&value) {
                Some(v) => {
                    values.insert(key, v);
                }
                None => tracing::debug!("Ignoring register '{}' with value {}", key, value),
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<RegisterValue> {
        self.values.get(key).copied()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn set(&mut self, key: &str, value: RegisterValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, RegisterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RegisterValue)> for PanelSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, RegisterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Unit and decimal precision for one numeric register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySpec {
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

impl DisplaySpec {
    pub fn new(unit: &str, precision: usize) -> Self {
        Self {
            unit: unit.to_string(),
            precision,
        }
    }
}

/// Static register key -> unit/precision mapping used only for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTable {
    entries: HashMap<String, DisplaySpec>,
}

impl Default for DisplayTable {
    fn default() -> Self {
        let entries = [
            ("reference_speed", DisplaySpec::new("RPM", 0)),
            ("actual_speed", DisplaySpec::new("RPM", 0)),
            ("motor1_temp", DisplaySpec::new("°C", 1)),
            ("motor2_temp", DisplaySpec::new("°C", 1)),
            ("motor1_current", DisplaySpec::new("A", 2)),
            ("motor2_current", DisplaySpec::new("A", 2)),
            ("total_current", DisplaySpec::new("A", 2)),
            ("distance", DisplaySpec::new("m", 1)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { entries }
    }
}

impl DisplayTable {
    /// Built-in table with entries replaced or added from configuration
    pub fn with_overrides(overrides: &HashMap<String, DisplaySpec>) -> Self {
        let mut table = Self::default();
        for (key, spec) in overrides {
            table.entries.insert(key.clone(), spec.clone());
        }
        table
    }

    pub fn spec(&self, key: &str) -> Option<&DisplaySpec> {
        self.entries.get(key)
    }

    /// Render a numeric value with the key's precision and unit
    pub fn format(&self, key: &str, value: f64) -> String {
        let (unit, precision) = match self.spec(key) {
            Some(spec) => (spec.unit.as_str(), spec.precision),
            None => ("", DEFAULT_PRECISION),
        };
        let number = format_number(value, precision);
        if unit.is_empty() {
            number
        } else {
            format!("{} {}", number, unit)
        }
    }
}

/// Round to `precision` decimals and strip trailing zeros
pub fn format_number(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
