//! Unit Registry: on-duty units and per-responder cooldowns
//!
//! Owns every unit and the next-dispatch timestamp of every responder seen.
//! A responder belongs to at most one unit at a time; a unit that shrinks to
//! the disband threshold or below is removed and its remaining members told.

use crate::context::DispatchContext;
use crate::cooldown::random_cooldown;
use crate::ports::EligibilityProvider;
use chrono::{DateTime, Utc};
use dispatch_types::{
    saturating_add, Capability, CooldownBounds, DispatchConfig, DispatchError, DispatchEvent,
    DispatchResult, ResponderId, Unit, UnitId,
};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Sorts after every real wait time
pub const UNAVAILABLE: f64 = f64::MAX;

/// Registry of on-duty units
#[derive(Debug)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    next_dispatch: HashMap<ResponderId, DateTime<Utc>>,
    disband_threshold: usize,
    idle_cooldown: CooldownBounds,
}

impl UnitRegistry {
    pub fn new(disband_threshold: usize, idle_cooldown: CooldownBounds) -> Self {
        Self {
            units: Vec::new(),
            next_dispatch: HashMap::new(),
            disband_threshold,
            idle_cooldown: idle_cooldown.normalized(),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.unit_disband_size, config.idle_cooldown)
    }

    pub fn disband_threshold(&self) -> usize {
        self.disband_threshold
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Put a new unit on duty.
    ///
    /// Returns false without changing anything if `members` is empty or any
    /// of them already serves in a unit.
    pub fn add_unit(
        &mut self,
        members: impl IntoIterator<Item = ResponderId>,
        ctx: &mut DispatchContext<'_>,
    ) -> bool {
        let unit = Unit::new(members, ctx.now);
        if unit.is_empty() {
            warn!("Refusing to form an empty unit");
            return false;
        }
        if let Some(taken) = unit.members().iter().find(|m| self.is_in_unit(m)) {
            warn!(responder = %taken, "Responder already serves in a unit");
            return false;
        }

        for member in unit.members() {
            self.start_cooldown(member, ctx);
            ctx.sink.notify(
                member,
                &DispatchEvent::OnDuty {
                    unit_id: unit.id.clone(),
                },
            );
        }

        info!(
            unit = %unit.id.short(),
            members = unit.len(),
            "Unit on duty"
        );
        self.units.push(unit);
        true
    }

    /// Remove a unit outright, without notifying anyone
    pub fn remove_unit(&mut self, unit_id: &UnitId) -> Option<Unit> {
        let index = self.position(unit_id)?;
        let unit = self.units.remove(index);
        debug!(unit = %unit.id.short(), "Unit removed");
        Some(unit)
    }

    /// Units in registration order
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, unit_id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| &u.id == unit_id)
    }

    /// The unit `responder` serves in, if any
    pub fn unit_of(&self, responder: &ResponderId) -> Option<&Unit> {
        self.units.iter().find(|u| u.contains(responder))
    }

    pub fn is_in_unit(&self, responder: &ResponderId) -> bool {
        self.unit_of(responder).is_some()
    }

    fn position(&self, unit_id: &UnitId) -> Option<usize> {
        self.units.iter().position(|u| &u.id == unit_id)
    }

    /// Bring `responder` into an existing unit.
    ///
    /// A responder serving elsewhere leaves that unit first, which may
    /// disband it. Existing members hear about the join and the newcomer
    /// starts an idle cooldown.
    pub fn add_member(
        &mut self,
        unit_id: &UnitId,
        responder: ResponderId,
        ctx: &mut DispatchContext<'_>,
    ) -> DispatchResult<()> {
        let target = self
            .unit(unit_id)
            .ok_or_else(|| DispatchError::UnitNotFound(unit_id.clone()))?;
        if target.contains(&responder) {
            return Err(DispatchError::AlreadyInUnit(responder));
        }

        if let Some(previous) = self.unit_of(&responder).map(|u| u.id.clone()) {
            self.remove_member(&previous, &responder, ctx);
        }

        // Leaving the previous unit never touches the target
        let index = self
            .position(unit_id)
            .ok_or_else(|| DispatchError::UnitNotFound(unit_id.clone()))?;
        let unit = &mut self.units[index];
        for member in unit.members() {
            ctx.sink.notify(
                member,
                &DispatchEvent::MemberJoined {
                    unit_id: unit_id.clone(),
                    member: responder.clone(),
                },
            );
        }
        unit.insert_member(responder.clone());
        ctx.sink.notify(
            &responder,
            &DispatchEvent::OnDuty {
                unit_id: unit_id.clone(),
            },
        );
        let size = unit.len();

        self.start_cooldown(&responder, ctx);
        info!(
            unit = %unit_id.short(),
            responder = %responder,
            size,
            "Responder joined unit"
        );
        Ok(())
    }

    /// Take `responder` out of a unit.
    ///
    /// Returns false if they were not a member. If the unit is left at or
    /// below the disband threshold it is disbanded.
    pub fn remove_member(
        &mut self,
        unit_id: &UnitId,
        responder: &ResponderId,
        ctx: &mut DispatchContext<'_>,
    ) -> bool {
        let Some(index) = self.position(unit_id) else {
            return false;
        };
        let unit = &mut self.units[index];
        if !unit.remove_member(responder) {
            return false;
        }

        ctx.sink.notify(
            responder,
            &DispatchEvent::OffDuty {
                unit_id: unit_id.clone(),
            },
        );
        for member in unit.members() {
            ctx.sink.notify(
                member,
                &DispatchEvent::MemberLeft {
                    unit_id: unit_id.clone(),
                    member: responder.clone(),
                },
            );
        }
        info!(
            unit = %unit_id.short(),
            responder = %responder,
            size = unit.len(),
            "Responder left unit"
        );

        if unit.len() <= self.disband_threshold {
            for member in unit.members() {
                ctx.sink.notify(
                    member,
                    &DispatchEvent::UnitDisbanded {
                        unit_id: unit_id.clone(),
                    },
                );
            }
            let disbanded = self.units.remove(index);
            info!(
                unit = %unit_id.short(),
                remaining = disbanded.len(),
                "Unit disbanded"
            );
        }
        true
    }

    /// Override a unit's ordering priority.
    ///
    /// A positive priority also clears every member's cooldown so the unit
    /// is ready at once.
    pub fn set_priority(&mut self, unit_id: &UnitId, priority: i32) -> DispatchResult<()> {
        let index = self
            .position(unit_id)
            .ok_or_else(|| DispatchError::UnitNotFound(unit_id.clone()))?;
        let unit = &mut self.units[index];
        unit.priority = priority;

        if priority > 0 {
            for member in unit.members() {
                self.next_dispatch
                    .insert(member.clone(), DateTime::<Utc>::UNIX_EPOCH);
            }
        }
        info!(unit = %unit_id.short(), priority, "Unit priority set");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Availability and ordering
    // ------------------------------------------------------------------

    /// Positive priority, or every member eligible
    pub fn is_available(&self, unit: &Unit, directory: &dyn EligibilityProvider) -> bool {
        unit.priority > 0 || unit.members().iter().all(|m| directory.is_eligible(m))
    }

    /// Milliseconds until the unit may be dispatched again.
    ///
    /// The members' average remaining cooldown, floored at zero, minus the
    /// unit priority. Unavailable and empty units return [`UNAVAILABLE`].
    pub fn time_until_next_dispatch(
        &self,
        unit: &Unit,
        now: DateTime<Utc>,
        directory: &dyn EligibilityProvider,
    ) -> f64 {
        if unit.is_empty() || !self.is_available(unit, directory) {
            return UNAVAILABLE;
        }

        let total: f64 = unit
            .members()
            .iter()
            .map(|m| {
                self.next_dispatch
                    .get(m)
                    .map(|at| (*at - now).num_milliseconds() as f64)
                    .unwrap_or(0.0)
            })
            .sum();
        let average = total / unit.len() as f64;

        average.max(0.0) - f64::from(unit.priority)
    }

    /// All units, soonest dispatchable first.
    ///
    /// Units are shuffled before a stable sort, so ties come out in a fresh
    /// random order on every call.
    pub fn units_ordered(&self, ctx: &mut DispatchContext<'_>) -> Vec<&Unit> {
        let mut keyed: Vec<(f64, &Unit)> = self
            .units
            .iter()
            .map(|u| (self.time_until_next_dispatch(u, ctx.now, ctx.directory), u))
            .collect();

        keyed.shuffle(&mut *ctx.rng);
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        debug!(units = keyed.len(), "Units ordered for dispatch");
        keyed.into_iter().map(|(_, u)| u).collect()
    }

    /// Every on-duty responder
    pub fn on_duty_responders(&self) -> impl Iterator<Item = &ResponderId> {
        self.units.iter().flat_map(|u| u.members().iter())
    }

    pub fn on_duty_count(&self) -> usize {
        self.units.iter().map(Unit::len).sum()
    }

    /// Members of available units
    pub fn available_count(&self, directory: &dyn EligibilityProvider) -> usize {
        self.units
            .iter()
            .filter(|u| self.is_available(u, directory))
            .map(Unit::len)
            .sum()
    }

    /// Members of available units that are off cooldown and have no member
    /// flagged never-idle
    pub fn ready_count(&self, now: DateTime<Utc>, directory: &dyn EligibilityProvider) -> usize {
        self.units
            .iter()
            .filter(|u| self.time_until_next_dispatch(u, now, directory) <= 0.0)
            .filter(|u| {
                !u.members()
                    .iter()
                    .any(|m| directory.has_capability(m, Capability::NeverIdle))
            })
            .map(Unit::len)
            .sum()
    }

    // ------------------------------------------------------------------
    // Cooldowns
    // ------------------------------------------------------------------

    pub fn next_dispatch_time(&self, responder: &ResponderId) -> Option<DateTime<Utc>> {
        self.next_dispatch.get(responder).copied()
    }

    pub fn set_next_dispatch_time(&mut self, responder: ResponderId, at: DateTime<Utc>) {
        self.next_dispatch.insert(responder, at);
    }

    /// Sample an idle cooldown for `responder` and return when it ends
    pub fn start_cooldown(
        &mut self,
        responder: &ResponderId,
        ctx: &mut DispatchContext<'_>,
    ) -> DateTime<Utc> {
        let at = saturating_add(ctx.now, random_cooldown(&mut *ctx.rng, &self.idle_cooldown));
        debug!(responder = %responder, until = %at, "Idle cooldown started");
        self.next_dispatch.insert(responder.clone(), at);
        at
    }

    /// First sight of a responder: ready from `now` unless a cooldown is
    /// already on record
    pub fn session_started(&mut self, responder: ResponderId, now: DateTime<Utc>) {
        self.next_dispatch.entry(responder).or_insert(now);
    }
}
