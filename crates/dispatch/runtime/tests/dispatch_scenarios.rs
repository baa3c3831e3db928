use chrono::{DateTime, Duration, TimeZone, Utc};
use dispatch_runtime::{
    DispatchCenter, EncounterOutcome, InMemoryDirectory, ManualClock, RecordingSink,
};
use dispatch_types::{
    CategoryConfig, CooldownBounds, DispatchConfig, DispatchEvent, Location, ResponderId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

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

fn harness(config: DispatchConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let directory = Arc::new(InMemoryDirectory::with_online(ids(&[
        "a", "b", "c", "d", "e", "f",
    ])));
    let sink = Arc::new(RecordingSink::new());
    let center = DispatchCenter::with_parts(
        &config,
        clock.clone(),
        directory.clone(),
        sink.clone(),
        StdRng::seed_from_u64(2024),
    );
    Harness {
        center,
        clock,
        directory,
        sink,
    }
}

fn fire_config() -> DispatchConfig {
    let mut config = DispatchConfig::default().with_category(
        "fire",
        CategoryConfig::new("Fire")
            .with_cap(2)
            .with_par(1)
            .with_duration_millis(600_000),
    );
    config.encounter_cooldown = CooldownBounds::fixed(1_800_000);
    config
}

fn somewhere() -> Location {
    Location::new("world", 12.0, 70.0, -8.0)
}

#[test]
fn unanswered_fire_expires_and_resets_encounter() {
    let mut h = harness(fire_config());

    let emergency = h
        .center
        .report("fire", ResponderId::new("caller"), somewhere(), Duration::zero())
        .unwrap();
    assert!(emergency.assigned_responders.is_empty());
    assert_eq!(h.center.emergencies().len(), 1);

    h.clock.advance(Duration::milliseconds(599_999));
    assert!(h.center.cleanup().is_empty());

    let now = h.clock.advance(Duration::milliseconds(1));
    let removed = h.center.cleanup();
    assert_eq!(removed.len(), 1);
    assert!(h.center.emergencies().is_empty());
    assert_eq!(h.center.next_encounter_time(), now + Duration::minutes(30));
}

#[test]
fn unit_disbands_after_two_departures() {
    let mut h = harness(fire_config());
    assert!(h.center.add_unit(ids(&["a", "b", "c"])));
    let unit_id = h.center.unit_of(&ResponderId::new("a")).unwrap().id.clone();

    assert!(h.center.remove_member(&unit_id, &ResponderId::new("a")));
    assert_eq!(h.center.unit(&unit_id).unwrap().len(), 2);

    assert!(h.center.remove_member(&unit_id, &ResponderId::new("b")));
    assert!(h.center.units().is_empty());
    for member in ids(&["a", "b", "c"]) {
        assert!(h.center.unit_of(&member).is_none());
    }
    assert_eq!(
        h.sink.events_for(&ResponderId::new("c")).last(),
        Some(&DispatchEvent::UnitDisbanded { unit_id })
    );
}

#[test]
fn overlapping_unit_is_rejected() {
    let mut h = harness(fire_config());

    assert!(h.center.add_unit(ids(&["a", "b"])));
    assert!(!h.center.add_unit(ids(&["b", "c"])));

    assert_eq!(h.center.units().len(), 1);
    let unit = h.center.unit_of(&ResponderId::new("a")).unwrap();
    assert!(unit.contains(&ResponderId::new("b")));
    assert!(h.center.unit_of(&ResponderId::new("c")).is_none());
}

#[test]
fn report_dispatch_and_expire() {
    let mut h = harness(fire_config());
    h.center.add_unit(ids(&["a"]));
    h.center.add_unit(ids(&["b", "c"]));
    h.center.add_unit(ids(&["d"]));
    h.sink.clear();

    let emergency = h
        .center
        .report("fire", ResponderId::new("caller"), somewhere(), Duration::zero())
        .unwrap();
    let assigned = emergency.assigned_responders.len();
    assert!((1..=2).contains(&assigned));
    assert_eq!(h.sink.recipients_of("emergency_reported").len(), assigned);
    assert_eq!(h.center.open_dispatch_slots(), 2);

    assert!(h.center.dispatch(&emergency.id, &ResponderId::new("b")));
    assert_eq!(h.center.open_dispatch_slots(), 1);
    assert_eq!(h.sink.recipients_of("dispatched_self"), ids(&["b"]));
    assert_eq!(h.sink.recipients_of("dispatched_other"), ids(&["a", "c", "d"]));

    // Dispatched responder is cooling down; par met so no encounter reset
    assert!(h.center.next_dispatch_time(&ResponderId::new("b")).unwrap() > t0());
    let before = h.center.next_encounter_time();
    h.clock.advance(Duration::minutes(10));
    assert_eq!(h.center.open_dispatch_slots(), 0);
    assert_eq!(h.center.next_encounter_time(), before);
}

#[test]
fn freeze_blocks_reports_and_encounters() {
    let mut config = fire_config();
    config.encounter_cooldown = CooldownBounds::fixed(0);
    config.idle_cooldown = CooldownBounds::fixed(0);
    let mut h = harness(config);
    h.center.add_unit(ids(&["a"]));

    h.center.freeze_for(Duration::minutes(5));
    assert!(h
        .center
        .report("fire", ResponderId::new("caller"), somewhere(), Duration::zero())
        .is_err());
    assert_eq!(h.center.tick(), EncounterOutcome::Frozen);
    assert_eq!(h.center.freeze_remaining(), Duration::minutes(5));

    h.clock.advance(Duration::minutes(5));
    assert_eq!(h.center.freeze_remaining(), Duration::zero());
    assert!(matches!(h.center.tick(), EncounterOutcome::Triggered(_)));
}

#[test]
fn ineligible_member_blocks_whole_unit() {
    let mut h = harness(fire_config());
    h.center.add_unit(ids(&["a", "b"]));
    h.directory.set_external(ResponderId::new("b"), Some(false));

    let emergency = h
        .center
        .report("fire", ResponderId::new("caller"), somewhere(), Duration::zero())
        .unwrap();
    assert!(emergency.assigned_responders.is_empty());
    assert_eq!(h.center.available_count(), 0);
}
