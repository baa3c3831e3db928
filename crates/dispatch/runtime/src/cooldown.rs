//! Cooldown sampling

use chrono::Duration;
use dispatch_types::{duration_from_millis, CooldownBounds};
use rand::Rng;

/// Sample a cooldown uniformly from `[lower, upper)`.
///
/// Degenerate bounds return `lower` without touching the generator.
/// Inverted bounds are treated as if they had been written the other way round.
pub fn random_cooldown<R: Rng + ?Sized>(rng: &mut R, bounds: &CooldownBounds) -> Duration {
    let bounds = bounds.normalized();
    if bounds.is_degenerate() {
        return duration_from_millis(bounds.lower_millis);
    }
    duration_from_millis(rng.gen_range(bounds.lower_millis..bounds.upper_millis))
}
