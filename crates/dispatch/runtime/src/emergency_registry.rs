//! Emergency Registry: live emergencies and dispatch-slot accounting
//!
//! Emergencies are kept in report order. Every read that depends on
//! freshness runs `cleanup` first, so expired emergencies never count
//! toward open slots.

use crate::context::DispatchContext;
use crate::cooldown::random_cooldown;
use crate::encounter_scheduler::EncounterScheduler;
use crate::unit_registry::UnitRegistry;
use chrono::{DateTime, Duration, Utc};
use dispatch_types::{
    saturating_add, DispatchEvent, Emergency, EmergencyCategory, EmergencyId, Location,
    ResponderId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of live emergencies
#[derive(Debug, Default)]
pub struct EmergencyRegistry {
    emergencies: Vec<Emergency>,
}

impl EmergencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new emergency and offer it to units in dispatch order.
    ///
    /// Whole units are admitted while they fit under the category's cap.
    /// The first candidate is always admitted so every emergency reaches at
    /// least one unit when any is available. A positive `delay` shifts
    /// activation and counts as organic activity, pushing the next
    /// encounter out past it.
    #[allow(clippy::too_many_arguments)]
    pub fn report(
        &mut self,
        category: Arc<EmergencyCategory>,
        reporter: ResponderId,
        location: Location,
        delay: Duration,
        units: &UnitRegistry,
        scheduler: &mut EncounterScheduler,
        ctx: &mut DispatchContext<'_>,
    ) -> Emergency {
        self.cleanup(scheduler, ctx);

        let mut emergency =
            Emergency::new(category, reporter, location, ctx.now).activate(delay);
        let cap = emergency.dispatch_cap() as usize;

        let candidates: Vec<Vec<ResponderId>> = units
            .units_ordered(ctx)
            .into_iter()
            .filter(|u| units.is_available(u, ctx.directory))
            .map(|u| u.members().to_vec())
            .collect();

        for (index, members) in candidates.into_iter().enumerate() {
            if index > 0 && emergency.assigned_responders.len() + members.len() > cap {
                continue;
            }
            for member in members {
                emergency.assign(member);
            }
        }

        for responder in &emergency.assigned_responders {
            ctx.sink.notify(
                responder,
                &DispatchEvent::EmergencyReported {
                    emergency_id: emergency.id.clone(),
                    category: emergency.category.key.clone(),
                    name: emergency.name().to_string(),
                    icon: emergency.category.icon.clone(),
                },
            );
        }

        if emergency.delay() > Duration::zero() {
            let cooldown = random_cooldown(&mut *ctx.rng, &scheduler.encounter_cooldown());
            scheduler.defer_encounter_until(saturating_add(emergency.start_time, cooldown));
        }

        info!(
            emergency = %emergency.id.short(),
            category = %emergency.category.key,
            reporter = %emergency.reporter,
            assigned = emergency.assigned_responders.len(),
            delay_ms = emergency.delay().num_milliseconds(),
            "Emergency reported"
        );

        self.emergencies.push(emergency.clone());
        emergency
    }

    /// Remove every expired emergency and return them.
    ///
    /// An emergency that expired below its par restarts the encounter
    /// cooldown.
    pub fn cleanup(
        &mut self,
        scheduler: &mut EncounterScheduler,
        ctx: &mut DispatchContext<'_>,
    ) -> Vec<Emergency> {
        let now = ctx.now;
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.emergencies)
            .into_iter()
            .partition(|e| e.is_expired(now));
        self.emergencies = live;

        for emergency in &expired {
            debug!(
                emergency = %emergency.id.short(),
                dispatched = emergency.dispatched(),
                par = emergency.dispatch_par(),
                "Emergency expired"
            );
            if !emergency.is_par_fulfilled() {
                scheduler.reset_encounter_cooldown(ctx);
            }
        }
        expired
    }

    /// Send `responder` to an emergency.
    ///
    /// Unknown ids are ignored and return false. The cap is not enforced;
    /// every dispatch is counted. The responder gets the destination, every
    /// other on-duty responder hears who went, and the responder's idle
    /// cooldown restarts.
    pub fn dispatch(
        &mut self,
        emergency_id: &EmergencyId,
        responder: &ResponderId,
        units: &mut UnitRegistry,
        ctx: &mut DispatchContext<'_>,
    ) -> bool {
        let Some(emergency) = self.emergencies.iter_mut().find(|e| &e.id == emergency_id) else {
            debug!(emergency = %emergency_id, "Dispatch to unknown emergency ignored");
            return false;
        };

        let dispatched = emergency.record_dispatch();
        let (x, y, z) = emergency.location.block_coords();

        ctx.sink.notify(
            responder,
            &DispatchEvent::DispatchedSelf {
                emergency_id: emergency.id.clone(),
                x,
                y,
                z,
            },
        );
        for other in units.on_duty_responders().filter(|r| *r != responder) {
            ctx.sink.notify(
                other,
                &DispatchEvent::DispatchedOther {
                    emergency_id: emergency.id.clone(),
                    emergency_name: emergency.name().to_string(),
                    responder: responder.clone(),
                    dispatched,
                    cap: emergency.dispatch_cap(),
                },
            );
        }

        info!(
            emergency = %emergency.id.short(),
            responder = %responder,
            dispatched,
            cap = emergency.dispatch_cap(),
            "Responder dispatched"
        );

        units.start_cooldown(responder, ctx);
        true
    }

    /// Open dispatch slots over live emergencies, after cleanup
    pub fn open_dispatch_slots(
        &mut self,
        scheduler: &mut EncounterScheduler,
        ctx: &mut DispatchContext<'_>,
    ) -> u64 {
        self.cleanup(scheduler, ctx);
        self.emergencies
            .iter()
            .map(|e| u64::from(e.open_slots()))
            .sum()
    }

    /// Current emergencies, which may include expired ones until the next cleanup
    pub fn emergencies(&self) -> &[Emergency] {
        &self.emergencies
    }

    pub fn get(&self, emergency_id: &EmergencyId) -> Option<&Emergency> {
        self.emergencies.iter().find(|e| &e.id == emergency_id)
    }

    /// The first unexpired emergency within `radius` of `location` in the same world
    pub fn nearby(
        &self,
        location: &Location,
        radius: f64,
        now: DateTime<Utc>,
    ) -> Option<&Emergency> {
        let radius_squared = radius * radius;
        self.emergencies.iter().find(|e| {
            !e.is_expired(now)
                && e
                    .location
                    .distance_squared(location)
                    .is_some_and(|d| d <= radius_squared)
        })
    }

    pub fn len(&self) -> usize {
        self.emergencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emergencies.is_empty()
    }
}
