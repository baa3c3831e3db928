//! Emergency categories

use crate::{duration_from_millis, CategoryKey};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Dispatch cap used when a category configures a non-positive cap
pub const DEFAULT_DISPATCH_CAP: u32 = 1;

/// Duration used when a category configures a non-positive duration (10 minutes)
pub const DEFAULT_DURATION_MILLIS: u64 = 600_000;

/// Longest duration a configured value is allowed to express (100 years)
pub const MAX_DURATION_MILLIS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// Icon material used when a category does not name one
pub const DEFAULT_ICON_MATERIAL: &str = "music_disc_cat";

/// Icon material shown once an emergency's dispatch cap is reached
pub const DEFAULT_CAP_ICON_MATERIAL: &str = "red_wool";

/// Icon shown for an emergency in a selection menu.
///
/// The material name is opaque to the engine; the presentation layer
/// interprets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IconSpec {
    pub material: String,
    #[serde(default)]
    pub custom_model_data: i32,
}

impl IconSpec {
    pub fn new(material: impl Into<String>, custom_model_data: i32) -> Self {
        Self {
            material: material.into(),
            custom_model_data,
        }
    }

    /// The icon substituted once an emergency's cap is fulfilled
    pub fn cap_default() -> Self {
        Self::new(DEFAULT_CAP_ICON_MATERIAL, 0)
    }
}

impl Default for IconSpec {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_MATERIAL, 0)
    }
}

/// An immutable emergency category definition.
///
/// Categories are normalized when the catalog is built, so `dispatch_cap`
/// is always at least 1 and `duration_millis` is always positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyCategory {
    /// Configuration key
    pub key: CategoryKey,
    /// Display name
    pub name: String,
    /// Description template, rendered by the presentation layer
    pub description: String,
    /// Menu icon
    pub icon: IconSpec,
    /// Maximum responders the emergency can usefully absorb (≥ 1)
    pub dispatch_cap: u32,
    /// Recommended responder count (may be 0)
    pub dispatch_par: u32,
    /// Time the emergency stays live after activation (> 0)
    pub duration_millis: u64,
}

impl EmergencyCategory {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: CategoryKey::new(key),
            name: name.into(),
            description: String::new(),
            icon: IconSpec::default(),
            dispatch_cap: DEFAULT_DISPATCH_CAP,
            dispatch_par: 0,
            duration_millis: DEFAULT_DURATION_MILLIS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: IconSpec) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_dispatch_cap(mut self, cap: u32) -> Self {
        self.dispatch_cap = cap.max(1);
        self
    }

    pub fn with_dispatch_par(mut self, par: u32) -> Self {
        self.dispatch_par = par;
        self
    }

    pub fn with_duration_millis(mut self, millis: u64) -> Self {
        self.duration_millis = if millis > 0 {
            millis
        } else {
            DEFAULT_DURATION_MILLIS
        };
        self
    }

    pub fn duration(&self) -> Duration {
        duration_from_millis(self.duration_millis)
    }
}
