//! Dispatch configuration
//!
//! The configuration file is YAML with kebab-case keys. Every field has a
//! default, so a partial file (or an empty one) is valid. Category values
//! are kept raw here; the catalog normalizes them when it is built.
//!
//! Category entries are read leniently: a malformed field becomes its zero
//! value and a malformed entry is skipped, so one bad category never takes
//! its siblings down with it.

use crate::{CooldownBounds, DispatchError, DispatchResult, IconSpec};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Top-level dispatch configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    /// A unit whose size drops to this value or below is disbanded
    #[serde(default = "default_unit_disband_size")]
    pub unit_disband_size: usize,
    /// Idle cooldown sampled for a responder after dispatch or joining a unit
    #[serde(default = "default_idle_cooldown")]
    pub idle_cooldown: CooldownBounds,
    /// Cooldown sampled between synthetic encounters
    #[serde(default = "default_encounter_cooldown")]
    pub encounter_cooldown: CooldownBounds,
    /// Cadence of the encounter evaluation
    #[serde(default = "default_encounter_interval_millis")]
    pub encounter_interval_millis: u64,
    /// Grace period before a disconnected responder leaves their unit
    #[serde(default = "default_departure_grace_millis")]
    pub departure_grace_millis: u64,
    /// Radius for the nearby-emergency query
    #[serde(default = "default_emergency_radius")]
    pub emergency_radius: f64,
    /// Icon shown once an emergency's dispatch cap is reached
    #[serde(default = "IconSpec::cap_default")]
    pub cap_icon: IconSpec,
    /// Emergency categories, keyed by category key
    #[serde(default, deserialize_with = "lenient_categories")]
    pub emergencies: BTreeMap<String, CategoryConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            unit_disband_size: default_unit_disband_size(),
            idle_cooldown: default_idle_cooldown(),
            encounter_cooldown: default_encounter_cooldown(),
            encounter_interval_millis: default_encounter_interval_millis(),
            departure_grace_millis: default_departure_grace_millis(),
            emergency_radius: default_emergency_radius(),
            cap_icon: IconSpec::cap_default(),
            emergencies: BTreeMap::new(),
        }
    }
}

impl DispatchConfig {
    /// Parse a configuration document
    pub fn from_yaml_str(contents: &str) -> DispatchResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| DispatchError::ConfigParse(e.to_string()))
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn with_category(mut self, key: impl Into<String>, category: CategoryConfig) -> Self {
        self.emergencies.insert(key.into(), category);
        self
    }
}

/// Raw configuration of one emergency category.
///
/// Numeric fields are signed so that out-of-range values can be detected
/// and replaced with defaults instead of failing the whole file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryConfig {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub icon_material: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub icon_custom_model_data: i32,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub dispatch_cap: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub dispatch_par: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration_millis: i64,
}

impl CategoryConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_cap(mut self, cap: i64) -> Self {
        self.dispatch_cap = cap;
        self
    }

    pub fn with_par(mut self, par: i64) -> Self {
        self.dispatch_par = par;
        self
    }

    pub fn with_duration_millis(mut self, millis: i64) -> Self {
        self.duration_millis = millis;
        self
    }
}

fn lenient_categories<'de, D>(deserializer: D) -> Result<BTreeMap<String, CategoryConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut categories = BTreeMap::new();
    for (key, value) in raw {
        match serde_yaml::from_value::<CategoryConfig>(value) {
            Ok(category) => {
                categories.insert(key, category);
            }
            Err(e) => warn!(category = %key, error = %e, "Malformed category, skipping"),
        }
    }
    Ok(categories)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => {
            warn!(value = ?other, "Expected text, ignoring value");
            None
        }
    })
}

/// Integers as the config API reads them: anything unparsable is 0
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => Some(0),
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!(value = ?value, "Expected an integer, using 0");
        0
    }))
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_i64(deserializer)?;
    Ok(i32::try_from(value).unwrap_or_else(|_| {
        warn!(value, "Integer out of range, using 0");
        0
    }))
}

const fn default_unit_disband_size() -> usize {
    1
}

const fn default_idle_cooldown() -> CooldownBounds {
    CooldownBounds {
        lower_millis: 20 * 60_000,
        upper_millis: 20 * 60_000,
    }
}

const fn default_encounter_cooldown() -> CooldownBounds {
    CooldownBounds {
        lower_millis: 30 * 60_000,
        upper_millis: 60 * 60_000,
    }
}

const fn default_encounter_interval_millis() -> u64 {
    60_000
}

const fn default_departure_grace_millis() -> u64 {
    120_000
}

const fn default_emergency_radius() -> f64 {
    50.0
}
