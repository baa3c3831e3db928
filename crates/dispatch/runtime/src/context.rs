//! Per-operation context handed to the registries

use crate::ports::{EligibilityProvider, NotificationSink};
use chrono::{DateTime, Utc};
use rand::RngCore;

/// Everything a registry operation needs from outside its own state.
///
/// Built fresh for each operation so that `now` is read once and every
/// step of the operation agrees on it.
pub struct DispatchContext<'a> {
    pub now: DateTime<Utc>,
    pub directory: &'a dyn EligibilityProvider,
    pub sink: &'a dyn NotificationSink,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> DispatchContext<'a> {
    pub fn new(
        now: DateTime<Utc>,
        directory: &'a dyn EligibilityProvider,
        sink: &'a dyn NotificationSink,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            now,
            directory,
            sink,
            rng,
        }
    }
}
