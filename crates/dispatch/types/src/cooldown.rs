//! Cooldown bounds

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Convert a configured millisecond count into a `chrono::Duration`,
/// saturating values that do not fit.
pub fn duration_from_millis(millis: u64) -> Duration {
    Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// `at + delta`, clamped to the representable range instead of overflowing
pub fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Inclusive-lower, exclusive-upper bounds for a sampled cooldown, in milliseconds.
///
/// Sampling returns `lower_millis` directly when both bounds are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CooldownBounds {
    pub lower_millis: u64,
    pub upper_millis: u64,
}

impl CooldownBounds {
    pub fn new(lower_millis: u64, upper_millis: u64) -> Self {
        Self {
            lower_millis,
            upper_millis,
        }
    }

    /// Degenerate bounds that always sample to `millis`
    pub fn fixed(millis: u64) -> Self {
        Self::new(millis, millis)
    }

    pub fn from_minutes(lower: u64, upper: u64) -> Self {
        Self::new(lower * 60_000, upper * 60_000)
    }

    pub fn is_degenerate(&self) -> bool {
        self.lower_millis == self.upper_millis
    }

    pub fn is_inverted(&self) -> bool {
        self.lower_millis > self.upper_millis
    }

    /// Bounds with `lower <= upper`, swapping them if configured backwards
    pub fn normalized(self) -> Self {
        if self.is_inverted() {
            Self::new(self.upper_millis, self.lower_millis)
        } else {
            self
        }
    }

    pub fn lower(&self) -> Duration {
        duration_from_millis(self.lower_millis)
    }

    pub fn upper(&self) -> Duration {
        duration_from_millis(self.upper_millis)
    }

    /// Bounds with both ends capped at `max_millis`
    pub fn clamped(self, max_millis: u64) -> Self {
        Self::new(self.lower_millis.min(max_millis), self.upper_millis.min(max_millis))
    }

    pub fn exceeds(&self, max_millis: u64) -> bool {
        self.lower_millis > max_millis || self.upper_millis > max_millis
    }
}
