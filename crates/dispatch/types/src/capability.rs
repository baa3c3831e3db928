//! Capability flags queried from the identity provider

use serde::{Deserialize, Serialize};

/// A capability flag a responder may carry.
///
/// The identity provider decides how flags are stored; the engine only asks
/// whether a responder has one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Opted out of dispatch entirely; the responder's unit is never available
    NeverAvailable,
    /// Never counted as idle, so the responder's unit never makes the
    /// system look under-utilized
    NeverIdle,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::NeverAvailable => "never-available",
            Capability::NeverIdle => "never-idle",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
