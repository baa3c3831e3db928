//! Encounter Scheduler: freeze window and synthetic encounters
//!
//! Evaluated on a fixed cadence. When dispatch is not frozen, the encounter
//! cooldown has elapsed and some unit is ready, one online responder is
//! handed a synthetic incident and the cooldown restarts.

use crate::context::DispatchContext;
use crate::cooldown::random_cooldown;
use crate::unit_registry::UnitRegistry;
use chrono::{DateTime, Duration, Utc};
use dispatch_types::{saturating_add, CooldownBounds, DispatchConfig, DispatchEvent, ResponderId};
use rand::Rng;
use tracing::{debug, info};

/// What one evaluation cycle did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncounterOutcome {
    /// Dispatch is frozen; the cycle was skipped
    Frozen,
    /// The encounter cooldown has not elapsed
    NotDue,
    /// Due, but no unit is ready
    NoReadyResponders,
    /// Due and ready, but nobody is online to receive it
    NoOnlineResponder,
    /// A synthetic encounter went to this responder
    Triggered(ResponderId),
}

/// Process-wide scheduling state
#[derive(Debug, Clone)]
pub struct EncounterScheduler {
    dispatch_frozen_until: DateTime<Utc>,
    next_encounter_time: DateTime<Utc>,
    encounter_cooldown: CooldownBounds,
}

impl EncounterScheduler {
    /// Unfrozen, with the first encounter one sampled cooldown after `now`
    pub fn new<R: Rng + ?Sized>(
        encounter_cooldown: CooldownBounds,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let encounter_cooldown = encounter_cooldown.normalized();
        Self {
            dispatch_frozen_until: DateTime::<Utc>::UNIX_EPOCH,
            next_encounter_time: saturating_add(now, random_cooldown(rng, &encounter_cooldown)),
            encounter_cooldown,
        }
    }

    pub fn from_config<R: Rng + ?Sized>(
        config: &DispatchConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        Self::new(config.encounter_cooldown, now, rng)
    }

    pub fn encounter_cooldown(&self) -> CooldownBounds {
        self.encounter_cooldown
    }

    // ------------------------------------------------------------------
    // Freeze window
    // ------------------------------------------------------------------

    pub fn is_frozen(&self, now: DateTime<Utc>) -> bool {
        now < self.dispatch_frozen_until
    }

    pub fn frozen_until(&self) -> DateTime<Utc> {
        self.dispatch_frozen_until
    }

    pub fn freeze_until(&mut self, until: DateTime<Utc>) {
        self.dispatch_frozen_until = until;
        info!(until = %until, "Dispatch frozen");
    }

    /// Freeze for `duration` from `now`; a non-positive duration lifts the freeze
    pub fn freeze_for(&mut self, duration: Duration, now: DateTime<Utc>) {
        self.freeze_until(saturating_add(now, duration));
    }

    /// Time left in the freeze window, never negative
    pub fn freeze_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.dispatch_frozen_until - now).max(Duration::zero())
    }

    // ------------------------------------------------------------------
    // Encounter timing
    // ------------------------------------------------------------------

    pub fn next_encounter_time(&self) -> DateTime<Utc> {
        self.next_encounter_time
    }

    /// Restart the encounter cooldown from `ctx.now`
    pub fn reset_encounter_cooldown(&mut self, ctx: &mut DispatchContext<'_>) -> DateTime<Utc> {
        self.next_encounter_time =
            saturating_add(ctx.now, random_cooldown(&mut *ctx.rng, &self.encounter_cooldown));
        debug!(next = %self.next_encounter_time, "Encounter cooldown reset");
        self.next_encounter_time
    }

    /// Push the next encounter out to at least `at`
    pub fn defer_encounter_until(&mut self, at: DateTime<Utc>) {
        if at > self.next_encounter_time {
            self.next_encounter_time = at;
            debug!(next = %at, "Encounter deferred");
        }
    }

    /// One evaluation cycle
    pub fn evaluate(
        &mut self,
        units: &UnitRegistry,
        ctx: &mut DispatchContext<'_>,
    ) -> EncounterOutcome {
        if self.is_frozen(ctx.now) {
            return EncounterOutcome::Frozen;
        }
        if ctx.now < self.next_encounter_time {
            return EncounterOutcome::NotDue;
        }
        if units.ready_count(ctx.now, ctx.directory) == 0 {
            return EncounterOutcome::NoReadyResponders;
        }
        self.create_encounter(ctx)
    }

    /// Hand a synthetic incident to the first online responder, then
    /// restart the cooldown whether or not anyone received it
    pub fn create_encounter(&mut self, ctx: &mut DispatchContext<'_>) -> EncounterOutcome {
        let target = ctx.directory.online_responders().into_iter().next();
        let outcome = match target {
            Some(responder) => {
                ctx.sink.notify(&responder, &DispatchEvent::EncounterTriggered);
                info!(responder = %responder, "Encounter triggered");
                EncounterOutcome::Triggered(responder)
            }
            None => EncounterOutcome::NoOnlineResponder,
        };
        self.reset_encounter_cooldown(ctx);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InMemoryDirectory, RecordingSink};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    struct Fixture {
        directory: InMemoryDirectory,
        sink: RecordingSink,
        rng: StdRng,
    }

    impl Fixture {
        fn ctx(&mut self, now: DateTime<Utc>) -> DispatchContext<'_> {
            DispatchContext::new(now, &self.directory, &self.sink, &mut self.rng)
        }
    }

    fn setup() -> (EncounterScheduler, UnitRegistry, Fixture) {
        let mut rng = StdRng::seed_from_u64(1);
        let scheduler = EncounterScheduler::new(CooldownBounds::fixed(600_000), t0(), &mut rng);
        let mut fx = Fixture {
            directory: InMemoryDirectory::with_online(vec![
                ResponderId::new("alice"),
                ResponderId::new("bob"),
            ]),
            sink: RecordingSink::new(),
            rng,
        };
        let mut units = UnitRegistry::new(1, CooldownBounds::fixed(0));
        units.add_unit(vec![ResponderId::new("bob")], &mut fx.ctx(t0()));
        fx.sink.clear();
        (scheduler, units, fx)
    }

    #[test]
    fn test_not_due_before_cooldown() {
        let (mut scheduler, units, mut fx) = setup();
        assert_eq!(scheduler.next_encounter_time(), t0() + Duration::minutes(10));

        let now = t0() + Duration::minutes(9);
        let outcome = scheduler.evaluate(&units, &mut fx.ctx(now));
        assert_eq!(outcome, EncounterOutcome::NotDue);
        assert!(fx.sink.is_empty());
    }

    #[test]
    fn test_triggers_first_online_and_resets() {
        let (mut scheduler, units, mut fx) = setup();
        let now = t0() + Duration::minutes(10);

        let outcome = scheduler.evaluate(&units, &mut fx.ctx(now));

        assert_eq!(outcome, EncounterOutcome::Triggered(ResponderId::new("alice")));
        assert_eq!(
            fx.sink.recipients_of("encounter_triggered"),
            vec![ResponderId::new("alice")]
        );
        assert_eq!(scheduler.next_encounter_time(), now + Duration::minutes(10));
    }

    #[test]
    fn test_freeze_suppresses_evaluation() {
        let (mut scheduler, units, mut fx) = setup();
        let now = t0() + Duration::minutes(10);
        scheduler.freeze_for(Duration::minutes(5), now);

        assert!(scheduler.is_frozen(now));
        assert_eq!(scheduler.freeze_remaining(now), Duration::minutes(5));
        assert_eq!(scheduler.evaluate(&units, &mut fx.ctx(now)), EncounterOutcome::Frozen);
        assert!(fx.sink.is_empty());

        let thawed = now + Duration::minutes(5);
        assert!(!scheduler.is_frozen(thawed));
        assert_eq!(
            scheduler.freeze_remaining(thawed + Duration::minutes(1)),
            Duration::zero()
        );
    }

    #[test]
    fn test_no_ready_units_skips() {
        let (mut scheduler, units, mut fx) = setup();
        fx.directory.set_online(ResponderId::new("bob"), false);
        let now = t0() + Duration::minutes(10);

        assert_eq!(
            scheduler.evaluate(&units, &mut fx.ctx(now)),
            EncounterOutcome::NoReadyResponders
        );
        assert_eq!(scheduler.next_encounter_time(), t0() + Duration::minutes(10));
    }

    #[test]
    fn test_nobody_online_still_resets() {
        let (mut scheduler, _units, mut fx) = setup();
        let nobody = InMemoryDirectory::new();
        let now = t0() + Duration::minutes(10);
        let mut ctx = DispatchContext::new(now, &nobody, &fx.sink, &mut fx.rng);

        assert_eq!(
            scheduler.create_encounter(&mut ctx),
            EncounterOutcome::NoOnlineResponder
        );
        assert_eq!(scheduler.next_encounter_time(), now + Duration::minutes(10));
    }

    #[test]
    fn test_defer_only_moves_forward() {
        let (mut scheduler, _units, _fx) = setup();
        let original = scheduler.next_encounter_time();

        scheduler.defer_encounter_until(original - Duration::minutes(1));
        assert_eq!(scheduler.next_encounter_time(), original);

        scheduler.defer_encounter_until(original + Duration::minutes(1));
        assert_eq!(scheduler.next_encounter_time(), original + Duration::minutes(1));
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scheduler =
            EncounterScheduler::new(CooldownBounds::fixed(u64::MAX), t0(), &mut rng);
        assert_eq!(scheduler.next_encounter_time(), DateTime::<Utc>::MAX_UTC);

        let mut fx = Fixture {
            directory: InMemoryDirectory::new(),
            sink: RecordingSink::new(),
            rng,
        };
        scheduler.reset_encounter_cooldown(&mut fx.ctx(t0()));
        assert_eq!(scheduler.next_encounter_time(), DateTime::<Utc>::MAX_UTC);

        scheduler.freeze_for(Duration::milliseconds(i64::MAX), t0());
        assert!(scheduler.is_frozen(t0() + Duration::days(365 * 1000)));
    }
}
