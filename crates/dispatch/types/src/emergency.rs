//! Emergencies: reported incidents awaiting responders
//!
//! An emergency is recorded at report time and stays live for its
//! category's duration, measured from its activation time. A delayed
//! report shifts activation into the future through [`Emergency::activate`].

use crate::{saturating_add, EmergencyCategory, EmergencyId, IconSpec, ResponderId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A point in a named world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Squared distance to `other`, or `None` when the points are in different worlds
    pub fn distance_squared(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        Some(dx * dx + dy * dy + dz * dz)
    }

    /// Whole-block coordinates, floored
    pub fn block_coords(&self) -> (i64, i64, i64) {
        (
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }
}

/// Where an emergency is in its lifecycle at a given instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyPhase {
    /// Recorded with a delay; activation is still in the future
    Pending,
    /// Live and accepting dispatches
    Active,
    /// Past `start_time + duration`; removed at the next cleanup
    Expired,
}

/// A reported incident
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Emergency {
    /// Unique emergency identity
    pub id: EmergencyId,
    /// The category this emergency was reported under
    pub category: Arc<EmergencyCategory>,
    /// Who reported it
    pub reporter: ResponderId,
    /// Where it happened
    pub location: Location,
    /// Description template captured from the category at report time
    pub description: String,
    /// When the report was recorded
    pub reported_at: DateTime<Utc>,
    /// Activation time: `reported_at` plus the activation delay
    pub start_time: DateTime<Utc>,
    /// Identities offered this emergency at report time
    pub assigned_responders: BTreeSet<ResponderId>,
    /// Responders dispatched so far; only grows
    dispatched: u32,
}

impl Emergency {
    /// Record a new emergency that activates immediately
    pub fn new(
        category: Arc<EmergencyCategory>,
        reporter: ResponderId,
        location: Location,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EmergencyId::generate(),
            description: category.description.clone(),
            category,
            reporter,
            location,
            reported_at,
            start_time: reported_at,
            assigned_responders: BTreeSet::new(),
            dispatched: 0,
        }
    }

    /// Shift activation `delay` past the report time.
    ///
    /// The start time is always re-based on `reported_at`, so the live
    /// window keeps the category's full duration from activation.
    pub fn activate(mut self, delay: Duration) -> Self {
        let delay = delay.max(Duration::zero());
        self.start_time = saturating_add(self.reported_at, delay);
        self
    }

    /// Activation delay relative to the report time
    pub fn delay(&self) -> Duration {
        self.start_time - self.reported_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        saturating_add(self.start_time, self.category.duration())
    }

    /// True once `now` reaches `start_time + duration` (inclusive)
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn phase(&self, now: DateTime<Utc>) -> EmergencyPhase {
        if self.is_expired(now) {
            EmergencyPhase::Expired
        } else if now < self.start_time {
            EmergencyPhase::Pending
        } else {
            EmergencyPhase::Active
        }
    }

    pub fn name(&self) -> &str {
        &self.category.name
    }

    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    pub fn dispatch_cap(&self) -> u32 {
        self.category.dispatch_cap
    }

    pub fn dispatch_par(&self) -> u32 {
        self.category.dispatch_par
    }

    /// Count one more dispatched responder and return the new total.
    ///
    /// The cap is informational: dispatches past it are still counted.
    pub fn record_dispatch(&mut self) -> u32 {
        self.dispatched = self.dispatched.saturating_add(1);
        self.dispatched
    }

    pub fn is_cap_fulfilled(&self) -> bool {
        self.dispatched >= self.category.dispatch_cap
    }

    pub fn is_par_fulfilled(&self) -> bool {
        self.dispatched >= self.category.dispatch_par
    }

    /// Dispatch slots still open: `max(cap - dispatched, 0)`
    pub fn open_slots(&self) -> u32 {
        self.category.dispatch_cap.saturating_sub(self.dispatched)
    }

    /// Offer this emergency to a responder; false if already offered
    pub fn assign(&mut self, responder: ResponderId) -> bool {
        self.assigned_responders.insert(responder)
    }

    /// Menu icon: the category icon until the cap is fulfilled, then `cap_icon`
    pub fn icon<'a>(&'a self, cap_icon: &'a IconSpec) -> &'a IconSpec {
        if self.is_cap_fulfilled() {
            cap_icon
        } else {
            &self.category.icon
        }
    }
}
