//! Units: groups of responders dispatched together

use crate::{ResponderId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An on-duty group of responders.
///
/// Membership changes go through the unit registry, which keeps every
/// responder in at most one unit and disbands units that shrink too far.
/// The raw helpers here only keep the member list free of duplicates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit identity
    pub id: UnitId,
    /// Members, in join order
    members: Vec<ResponderId>,
    /// Ordering override; positive values force availability
    pub priority: i32,
    /// When the unit went on duty
    pub formed_at: DateTime<Utc>,
}

impl Unit {
    /// Create a unit from its founding members, dropping duplicates
    pub fn new(members: impl IntoIterator<Item = ResponderId>, formed_at: DateTime<Utc>) -> Self {
        let mut unit = Self {
            id: UnitId::generate(),
            members: Vec::new(),
            priority: 0,
            formed_at,
        };
        for member in members {
            unit.insert_member(member);
        }
        unit
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn members(&self) -> &[ResponderId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, responder: &ResponderId) -> bool {
        self.members.contains(responder)
    }

    /// Append a member; false if already present
    pub fn insert_member(&mut self, responder: ResponderId) -> bool {
        if self.contains(&responder) {
            return false;
        }
        self.members.push(responder);
        true
    }

    /// Remove a member; false if not present
    pub fn remove_member(&mut self, responder: &ResponderId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != responder);
        self.members.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_dedupes_members() {
        let unit = Unit::new(
            vec![
                ResponderId::new("a"),
                ResponderId::new("b"),
                ResponderId::new("a"),
            ],
            Utc::now(),
        );
        assert_eq!(unit.len(), 2);
        assert_eq!(unit.priority, 0);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut unit = Unit::new(vec![ResponderId::new("a")], Utc::now());
        assert!(unit.insert_member(ResponderId::new("b")));
        assert!(!unit.insert_member(ResponderId::new("b")));
        assert!(unit.remove_member(&ResponderId::new("a")));
        assert!(!unit.remove_member(&ResponderId::new("a")));
        assert_eq!(unit.members(), &[ResponderId::new("b")]);
    }
}
