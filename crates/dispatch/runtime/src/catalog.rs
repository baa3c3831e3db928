//! Category Catalog: the immutable set of emergency categories
//!
//! Built once from configuration. Reloading builds a fresh catalog and swaps
//! the whole `Arc`; emergencies already reported keep their own category.

use dispatch_types::{
    CategoryConfig, CategoryKey, CooldownBounds, DispatchConfig, EmergencyCategory, IconSpec,
    DEFAULT_DISPATCH_CAP, DEFAULT_DURATION_MILLIS, DEFAULT_ICON_MATERIAL, MAX_DURATION_MILLIS,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Emergency categories keyed by category key
#[derive(Clone, Debug, Default)]
pub struct CategoryCatalog {
    categories: BTreeMap<CategoryKey, Arc<EmergencyCategory>>,
}

impl CategoryCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from configuration, substituting defaults for
    /// out-of-range values
    pub fn from_config(config: &DispatchConfig) -> Self {
        let categories: BTreeMap<_, _> = config
            .emergencies
            .iter()
            .map(|(key, raw)| {
                let category = normalize(key, raw);
                (category.key.clone(), Arc::new(category))
            })
            .collect();

        info!(categories = categories.len(), "Category catalog built");
        Self { categories }
    }

    /// Build a catalog from an explicit list of categories
    pub fn from_categories(categories: impl IntoIterator<Item = EmergencyCategory>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c.key.clone(), Arc::new(c)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<EmergencyCategory>> {
        self.categories.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.categories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CategoryKey> {
        self.categories.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EmergencyCategory>> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn normalize(key: &str, raw: &CategoryConfig) -> EmergencyCategory {
    let name = match raw.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => {
            warn!(category = key, "Category has no name, using its key");
            key.to_string()
        }
    };

    let description = match raw.description.as_deref() {
        Some(description) => description.to_string(),
        None => {
            warn!(category = key, "Category has no description, using its key");
            key.to_string()
        }
    };

    let material = match raw.icon_material.as_deref() {
        Some(material) if !material.trim().is_empty() => material.to_string(),
        _ => DEFAULT_ICON_MATERIAL.to_string(),
    };

    let dispatch_cap = match u32::try_from(raw.dispatch_cap) {
        Ok(cap) if cap > 0 => cap,
        _ => {
            warn!(
                category = key,
                configured = raw.dispatch_cap,
                default = DEFAULT_DISPATCH_CAP,
                "Invalid dispatch cap, using default"
            );
            DEFAULT_DISPATCH_CAP
        }
    };

    let dispatch_par = match u32::try_from(raw.dispatch_par) {
        Ok(par) => par,
        Err(_) if raw.dispatch_par < 0 => {
            warn!(
                category = key,
                configured = raw.dispatch_par,
                "Negative dispatch par, using 0"
            );
            0
        }
        Err(_) => u32::MAX,
    };

    let duration_millis = match u64::try_from(raw.duration_millis) {
        Ok(millis) if millis > MAX_DURATION_MILLIS => {
            warn!(
                category = key,
                configured = raw.duration_millis,
                max = MAX_DURATION_MILLIS,
                "Duration too long, clamping"
            );
            MAX_DURATION_MILLIS
        }
        Ok(millis) if millis > 0 => millis,
        _ => {
            warn!(
                category = key,
                configured = raw.duration_millis,
                default = DEFAULT_DURATION_MILLIS,
                "Invalid duration, using default"
            );
            DEFAULT_DURATION_MILLIS
        }
    };

    EmergencyCategory::new(key, name)
        .with_description(description)
        .with_icon(IconSpec::new(material, raw.icon_custom_model_data))
        .with_dispatch_cap(dispatch_cap)
        .with_dispatch_par(dispatch_par)
        .with_duration_millis(duration_millis)
}

/// Load configuration from `path`, falling back to defaults.
///
/// A missing or unparsable file is logged and yields the default
/// configuration, which has an empty catalog. Inverted cooldown bounds are
/// swapped and oversized ones clamped.
pub fn load_config_or_default(path: impl AsRef<Path>) -> DispatchConfig {
    let path = path.as_ref();
    let mut config = match DispatchConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load dispatch configuration, continuing with defaults"
            );
            DispatchConfig::default()
        }
    };

    config.idle_cooldown = sanitize_bounds("idle", config.idle_cooldown);
    config.encounter_cooldown = sanitize_bounds("encounter", config.encounter_cooldown);
    config
}

fn sanitize_bounds(which: &str, bounds: CooldownBounds) -> CooldownBounds {
    let mut bounds = bounds;
    if bounds.is_inverted() {
        warn!(
            cooldown = which,
            lower = bounds.lower_millis,
            upper = bounds.upper_millis,
            "Cooldown bounds inverted, swapping"
        );
        bounds = bounds.normalized();
    }
    if bounds.exceeds(MAX_DURATION_MILLIS) {
        warn!(
            cooldown = which,
            lower = bounds.lower_millis,
            upper = bounds.upper_millis,
            max = MAX_DURATION_MILLIS,
            "Cooldown bounds too long, clamping"
        );
        bounds = bounds.clamped(MAX_DURATION_MILLIS);
    }
    bounds
}
