//! Dispatch Center: composes the registries, scheduler and collaborators
//!
//! The single owner of all dispatch state. Every operation reads the clock
//! once, builds a [`DispatchContext`] from its collaborators and hands it to
//! the registry that does the work.

use crate::catalog::CategoryCatalog;
use crate::context::DispatchContext;
use crate::emergency_registry::EmergencyRegistry;
use crate::encounter_scheduler::{EncounterOutcome, EncounterScheduler};
use crate::ports::{Clock, EligibilityProvider, NotificationSink, SystemClock};
use crate::unit_registry::UnitRegistry;
use chrono::{DateTime, Duration, Utc};
use dispatch_types::{
    CategoryKey, DispatchConfig, DispatchError, DispatchResult, Emergency, EmergencyId, IconSpec,
    Location, ResponderId, Unit, UnitId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{info, warn};

/// The dispatch engine
pub struct DispatchCenter {
    catalog: Arc<CategoryCatalog>,
    emergencies: EmergencyRegistry,
    units: UnitRegistry,
    scheduler: EncounterScheduler,
    emergency_radius: f64,
    cap_icon: IconSpec,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn EligibilityProvider>,
    sink: Arc<dyn NotificationSink>,
    rng: StdRng,
}

impl DispatchCenter {
    /// Create a center on the system clock with an entropy-seeded generator
    pub fn new(
        config: &DispatchConfig,
        directory: Arc<dyn EligibilityProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_parts(
            config,
            Arc::new(SystemClock),
            directory,
            sink,
            StdRng::from_entropy(),
        )
    }

    /// Create a center with every collaborator supplied
    pub fn with_parts(
        config: &DispatchConfig,
        clock: Arc<dyn Clock>,
        directory: Arc<dyn EligibilityProvider>,
        sink: Arc<dyn NotificationSink>,
        mut rng: StdRng,
    ) -> Self {
        let scheduler = EncounterScheduler::from_config(config, clock.now(), &mut rng);
        let catalog = Arc::new(CategoryCatalog::from_config(config));

        info!(
            categories = catalog.len(),
            disband_size = config.unit_disband_size,
            next_encounter = %scheduler.next_encounter_time(),
            "Dispatch center created"
        );

        Self {
            catalog,
            emergencies: EmergencyRegistry::new(),
            units: UnitRegistry::from_config(config),
            scheduler,
            emergency_radius: config.emergency_radius,
            cap_icon: config.cap_icon.clone(),
            clock,
            directory,
            sink,
            rng,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub fn catalog(&self) -> Arc<CategoryCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Replace the catalog and presentation settings from `config`.
    ///
    /// Live emergencies keep the categories they were reported under.
    pub fn reload(&mut self, config: &DispatchConfig) {
        self.catalog = Arc::new(CategoryCatalog::from_config(config));
        self.cap_icon = config.cap_icon.clone();
        self.emergency_radius = config.emergency_radius;
        info!(categories = self.catalog.len(), "Category catalog reloaded");
    }

    pub fn cap_icon(&self) -> &IconSpec {
        &self.cap_icon
    }

    /// Icon to show for an emergency right now
    pub fn emergency_icon<'a>(&'a self, emergency: &'a Emergency) -> &'a IconSpec {
        emergency.icon(&self.cap_icon)
    }

    // ------------------------------------------------------------------
    // Emergencies
    // ------------------------------------------------------------------

    /// Report an emergency under category `key`.
    ///
    /// Rejected before any state changes while dispatch is frozen or when
    /// the key is not in the catalog.
    pub fn report(
        &mut self,
        key: &str,
        reporter: ResponderId,
        location: Location,
        delay: Duration,
    ) -> DispatchResult<Emergency> {
        let now = self.clock.now();
        if self.scheduler.is_frozen(now) {
            let remaining_ms = self.scheduler.freeze_remaining(now).num_milliseconds();
            warn!(reporter = %reporter, remaining_ms, "Report rejected, dispatch is frozen");
            return Err(DispatchError::Frozen { remaining_ms });
        }
        let category = self.catalog.get(key).ok_or_else(|| {
            warn!(category = key, reporter = %reporter, "Report rejected, unknown category");
            DispatchError::UnknownCategory(CategoryKey::new(key))
        })?;

        let mut ctx = DispatchContext::new(now, &*self.directory, &*self.sink, &mut self.rng);
        Ok(self.emergencies.report(
            category,
            reporter,
            location,
            delay,
            &self.units,
            &mut self.scheduler,
            &mut ctx,
        ))
    }

    /// Dispatch `responder` to an emergency; false if the id is unknown
    pub fn dispatch(&mut self, emergency_id: &EmergencyId, responder: &ResponderId) -> bool {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.emergencies
            .dispatch(emergency_id, responder, &mut self.units, &mut ctx)
    }

    pub fn emergencies(&self) -> &[Emergency] {
        self.emergencies.emergencies()
    }

    pub fn emergency(&self, emergency_id: &EmergencyId) -> Option<&Emergency> {
        self.emergencies.get(emergency_id)
    }

    pub fn cleanup(&mut self) -> Vec<Emergency> {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.emergencies.cleanup(&mut self.scheduler, &mut ctx)
    }

    pub fn open_dispatch_slots(&mut self) -> u64 {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.emergencies
            .open_dispatch_slots(&mut self.scheduler, &mut ctx)
    }

    /// First live emergency within the configured radius of `location`
    pub fn nearby_emergency(&self, location: &Location) -> Option<&Emergency> {
        self.emergencies
            .nearby(location, self.emergency_radius, self.clock.now())
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    pub fn add_unit(&mut self, members: impl IntoIterator<Item = ResponderId>) -> bool {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.units.add_unit(members, &mut ctx)
    }

    pub fn remove_unit(&mut self, unit_id: &UnitId) -> Option<Unit> {
        self.units.remove_unit(unit_id)
    }

    pub fn units(&self) -> &[Unit] {
        self.units.units()
    }

    pub fn unit(&self, unit_id: &UnitId) -> Option<&Unit> {
        self.units.unit(unit_id)
    }

    pub fn unit_of(&self, responder: &ResponderId) -> Option<&Unit> {
        self.units.unit_of(responder)
    }

    pub fn unit_registry(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn add_member(&mut self, unit_id: &UnitId, responder: ResponderId) -> DispatchResult<()> {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.units.add_member(unit_id, responder, &mut ctx)
    }

    pub fn remove_member(&mut self, unit_id: &UnitId, responder: &ResponderId) -> bool {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.units.remove_member(unit_id, responder, &mut ctx)
    }

    /// Take `responder` out of whichever unit they serve in
    pub fn go_off_duty(&mut self, responder: &ResponderId) -> DispatchResult<()> {
        let unit_id = self
            .units
            .unit_of(responder)
            .map(|u| u.id.clone())
            .ok_or_else(|| DispatchError::NotInUnit(responder.clone()))?;
        self.remove_member(&unit_id, responder);
        Ok(())
    }

    pub fn set_priority(&mut self, unit_id: &UnitId, priority: i32) -> DispatchResult<()> {
        self.units.set_priority(unit_id, priority)
    }

    /// Record a responder's session start
    pub fn session_started(&mut self, responder: ResponderId) {
        let now = self.clock.now();
        self.units.session_started(responder, now);
    }

    pub fn next_dispatch_time(&self, responder: &ResponderId) -> Option<DateTime<Utc>> {
        self.units.next_dispatch_time(responder)
    }

    /// Units in dispatch order
    pub fn units_ordered(&mut self) -> Vec<&Unit> {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.units.units_ordered(&mut ctx)
    }

    pub fn on_duty_count(&self) -> usize {
        self.units.on_duty_count()
    }

    pub fn available_count(&self) -> usize {
        self.units.available_count(&*self.directory)
    }

    pub fn ready_count(&self) -> usize {
        self.units.ready_count(self.clock.now(), &*self.directory)
    }

    // ------------------------------------------------------------------
    // Freeze and encounters
    // ------------------------------------------------------------------

    pub fn freeze_until(&mut self, until: DateTime<Utc>) {
        self.scheduler.freeze_until(until);
    }

    pub fn freeze_for(&mut self, duration: Duration) {
        let now = self.clock.now();
        self.scheduler.freeze_for(duration, now);
    }

    pub fn is_frozen(&self) -> bool {
        self.scheduler.is_frozen(self.clock.now())
    }

    pub fn frozen_until(&self) -> DateTime<Utc> {
        self.scheduler.frozen_until()
    }

    pub fn freeze_remaining(&self) -> Duration {
        self.scheduler.freeze_remaining(self.clock.now())
    }

    pub fn next_encounter_time(&self) -> DateTime<Utc> {
        self.scheduler.next_encounter_time()
    }

    /// One encounter cycle: cleanup, then evaluation
    pub fn tick(&mut self) -> EncounterOutcome {
        let mut ctx = DispatchContext::new(
            self.clock.now(),
            &*self.directory,
            &*self.sink,
            &mut self.rng,
        );
        self.emergencies.cleanup(&mut self.scheduler, &mut ctx);
        self.scheduler.evaluate(&self.units, &mut ctx)
    }
}

impl std::fmt::Debug for DispatchCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCenter")
            .field("categories", &self.catalog.len())
            .field("emergencies", &self.emergencies.len())
            .field("units", &self.units.units().len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InMemoryDirectory, ManualClock, RecordingSink};
    use chrono::TimeZone;
    use dispatch_types::{CategoryConfig, CooldownBounds};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<ResponderId> {
        names.iter().map(|n| ResponderId::new(*n)).collect()
    }

    struct Harness {
        center: DispatchCenter,
        clock: Arc<ManualClock>,
        directory: Arc<InMemoryDirectory>,
        sink: Arc<RecordingSink>,
    }

    fn setup() -> Harness {
        let mut config = DispatchConfig::default().with_category(
            "fire",
            CategoryConfig::new("Fire")
                .with_cap(2)
                .with_par(1)
                .with_duration_millis(600_000),
        );
        config.idle_cooldown = CooldownBounds::fixed(60_000);
        config.encounter_cooldown = CooldownBounds::fixed(1_800_000);

        let clock = Arc::new(ManualClock::new(t0()));
        let directory = Arc::new(InMemoryDirectory::with_online(ids(&["a", "b", "c"])));
        let sink = Arc::new(RecordingSink::new());
        let center = DispatchCenter::with_parts(
            &config,
            clock.clone(),
            directory.clone(),
            sink.clone(),
            StdRng::seed_from_u64(5),
        );
        Harness {
            center,
            clock,
            directory,
            sink,
        }
    }

    fn origin() -> Location {
        Location::new("world", 0.0, 64.0, 0.0)
    }

    #[test]
    fn test_report_rejects_unknown_category() {
        let mut h = setup();
        let err = h
            .center
            .report("flood", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCategory(_)));
        assert!(h.center.emergencies().is_empty());
    }

    #[test]
    fn test_report_rejected_while_frozen() {
        let mut h = setup();
        h.center.freeze_for(Duration::minutes(2));

        let err = h
            .center
            .report("fire", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap_err();
        assert!(matches!(err, DispatchError::Frozen { remaining_ms: 120_000 }));
        assert!(h.center.emergencies().is_empty());

        h.clock.advance(Duration::minutes(2));
        assert!(!h.center.is_frozen());
        assert!(h
            .center
            .report("fire", ResponderId::new("r"), origin(), Duration::zero())
            .is_ok());
    }

    #[test]
    fn test_huge_delay_report_is_recorded() {
        let mut h = setup();
        h.center.add_unit(ids(&["a"]));

        let emergency = h
            .center
            .report(
                "fire",
                ResponderId::new("r"),
                origin(),
                Duration::milliseconds(i64::MAX),
            )
            .unwrap();
        assert_eq!(emergency.start_time, DateTime::<Utc>::MAX_UTC);
        assert_eq!(h.center.next_encounter_time(), DateTime::<Utc>::MAX_UTC);

        h.clock.advance(Duration::days(365));
        assert!(h.center.cleanup().is_empty());
        assert_eq!(h.center.open_dispatch_slots(), 2);
    }

    #[test]
    fn test_huge_configured_durations_are_survivable() {
        let mut config = DispatchConfig::default().with_category(
            "siege",
            CategoryConfig::new("Siege").with_duration_millis(i64::MAX),
        );
        config.encounter_cooldown = CooldownBounds::fixed(u64::MAX);
        config.idle_cooldown = CooldownBounds::fixed(u64::MAX);

        let clock = Arc::new(ManualClock::new(t0()));
        let mut center = DispatchCenter::with_parts(
            &config,
            clock.clone(),
            Arc::new(InMemoryDirectory::with_online(ids(&["a"]))),
            Arc::new(RecordingSink::new()),
            StdRng::seed_from_u64(9),
        );
        assert_eq!(center.next_encounter_time(), DateTime::<Utc>::MAX_UTC);
        assert!(center.add_unit(ids(&["a"])));

        let emergency = center
            .report("siege", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap();
        assert_eq!(
            emergency.category.duration_millis,
            dispatch_types::MAX_DURATION_MILLIS
        );

        clock.advance(Duration::days(365));
        assert!(center.cleanup().is_empty());
        assert!(center.dispatch(&emergency.id, &ResponderId::new("a")));
        assert_eq!(center.tick(), EncounterOutcome::NotDue);
    }

    #[test]
    fn test_go_off_duty() {
        let mut h = setup();
        assert!(h.center.add_unit(ids(&["a", "b", "c"])));

        h.center.go_off_duty(&ResponderId::new("a")).unwrap();
        assert_eq!(h.center.on_duty_count(), 2);
        assert!(matches!(
            h.center.go_off_duty(&ResponderId::new("a")),
            Err(DispatchError::NotInUnit(_))
        ));
    }

    #[test]
    fn test_tick_triggers_when_due() {
        let mut h = setup();
        h.center.add_unit(ids(&["b"]));
        h.sink.clear();

        assert_eq!(h.center.tick(), EncounterOutcome::NotDue);

        h.clock.advance(Duration::minutes(30));
        assert_eq!(
            h.center.tick(),
            EncounterOutcome::Triggered(ResponderId::new("a"))
        );
        assert_eq!(h.center.next_encounter_time(), h.clock.now() + Duration::minutes(30));
    }

    #[test]
    fn test_status_queries() {
        let mut h = setup();
        h.center.add_unit(ids(&["a", "b"]));
        h.center
            .report("fire", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap();

        assert_eq!(h.center.on_duty_count(), 2);
        assert_eq!(h.center.available_count(), 2);
        assert_eq!(h.center.ready_count(), 0);
        assert_eq!(h.center.open_dispatch_slots(), 2);
        assert!(h
            .center
            .nearby_emergency(&Location::new("world", 10.0, 64.0, 10.0))
            .is_some());

        h.directory.set_online(ResponderId::new("b"), false);
        assert_eq!(h.center.available_count(), 0);
    }

    #[test]
    fn test_reload_keeps_live_categories() {
        let mut h = setup();
        let emergency = h
            .center
            .report("fire", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap();

        h.center.reload(&DispatchConfig::default());
        assert!(h.center.catalog().is_empty());
        assert_eq!(
            h.center.emergency(&emergency.id).unwrap().category.name,
            "Fire"
        );
    }

    #[test]
    fn test_icon_switches_to_cap_icon() {
        let mut h = setup();
        let emergency = h
            .center
            .report("fire", ResponderId::new("r"), origin(), Duration::zero())
            .unwrap();
        h.center.dispatch(&emergency.id, &ResponderId::new("a"));
        h.center.dispatch(&emergency.id, &ResponderId::new("b"));

        let live = h.center.emergency(&emergency.id).unwrap();
        assert_eq!(h.center.emergency_icon(live), &IconSpec::cap_default());
    }

    #[test]
    fn test_priority_resets_cooldowns() {
        let mut h = setup();
        h.center.add_unit(ids(&["a", "b"]));
        let unit_id = h.center.unit_of(&ResponderId::new("a")).unwrap().id.clone();
        assert_eq!(h.center.ready_count(), 0);

        h.center.set_priority(&unit_id, 1).unwrap();
        assert_eq!(h.center.ready_count(), 2);
    }
}
