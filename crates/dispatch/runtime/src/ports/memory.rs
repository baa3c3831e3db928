//! In-memory port implementations for development and testing

use super::traits::{Clock, EligibilityProvider, NotificationSink};
use chrono::{DateTime, Duration, Utc};
use dispatch_types::{saturating_add, Capability, DispatchEvent, ResponderId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = saturating_add(*now, by);
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Responder directory held in memory.
///
/// Online responders enumerate in sorted order.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    online: RwLock<BTreeSet<ResponderId>>,
    capabilities: RwLock<HashMap<ResponderId, HashSet<Capability>>>,
    external: RwLock<HashMap<ResponderId, bool>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with every given responder online
    pub fn with_online(responders: impl IntoIterator<Item = ResponderId>) -> Self {
        let directory = Self::new();
        for responder in responders {
            directory.set_online(responder, true);
        }
        directory
    }

    pub fn set_online(&self, responder: ResponderId, online: bool) {
        let mut set = self.online.write().unwrap_or_else(PoisonError::into_inner);
        if online {
            set.insert(responder);
        } else {
            set.remove(&responder);
        }
    }

    pub fn grant(&self, responder: ResponderId, capability: Capability) {
        self.capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(responder)
            .or_default()
            .insert(capability);
    }

    pub fn revoke(&self, responder: &ResponderId, capability: Capability) {
        if let Some(flags) = self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(responder)
        {
            flags.remove(&capability);
        }
    }

    /// Set the external eligibility answer; `None` clears it back to unknown
    pub fn set_external(&self, responder: ResponderId, eligible: Option<bool>) {
        let mut map = self.external.write().unwrap_or_else(PoisonError::into_inner);
        match eligible {
            Some(value) => {
                map.insert(responder, value);
            }
            None => {
                map.remove(&responder);
            }
        }
    }
}

impl EligibilityProvider for InMemoryDirectory {
    fn is_online(&self, responder: &ResponderId) -> bool {
        self.online
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(responder)
    }

    fn has_capability(&self, responder: &ResponderId, capability: Capability) -> bool {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(responder)
            .is_some_and(|flags| flags.contains(&capability))
    }

    fn external_eligibility(&self, responder: &ResponderId) -> Option<bool> {
        self.external
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(responder)
            .copied()
    }

    fn online_responders(&self) -> Vec<ResponderId> {
        self.online
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Sink that records every delivery
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(ResponderId, DispatchEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in order
    pub fn deliveries(&self) -> Vec<(ResponderId, DispatchEvent)> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_for(&self, recipient: &ResponderId) -> Vec<DispatchEvent> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(r, _)| r == recipient)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Recipients of every event of the given kind
    pub fn recipients_of(&self, kind: &str) -> Vec<ResponderId> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(r, _)| r.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, recipient: &ResponderId, event: &DispatchEvent) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient.clone(), event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.advance(Duration::seconds(5)), start + Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));
    }

    #[test]
    fn test_directory_eligibility() {
        let alice = ResponderId::new("alice");
        let bob = ResponderId::new("bob");
        let directory = InMemoryDirectory::with_online(vec![alice.clone(), bob.clone()]);

        assert!(directory.is_eligible(&alice));

        directory.grant(alice.clone(), Capability::NeverAvailable);
        assert!(!directory.is_eligible(&alice));
        directory.revoke(&alice, Capability::NeverAvailable);
        assert!(directory.is_eligible(&alice));

        directory.set_external(bob.clone(), Some(false));
        assert!(!directory.is_eligible(&bob));
        directory.set_external(bob.clone(), None);
        assert!(directory.is_eligible(&bob));

        directory.set_online(bob.clone(), false);
        assert!(!directory.is_eligible(&bob));
        assert_eq!(directory.online_responders(), vec![alice]);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        let alice = ResponderId::new("alice");
        sink.notify(&alice, &DispatchEvent::EncounterTriggered);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.recipients_of("encounter_triggered"), vec![alice.clone()]);
        assert_eq!(sink.events_for(&alice), vec![DispatchEvent::EncounterTriggered]);

        sink.clear();
        assert!(sink.is_empty());
    }
}
