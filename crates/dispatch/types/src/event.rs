//! Notification payloads delivered to responders
//!
//! The engine only decides *who* hears about *what*. Rendering, sound and
//! chat formatting belong to the notification sink.

use crate::{CategoryKey, EmergencyId, IconSpec, ResponderId, UnitId};
use serde::{Deserialize, Serialize};

/// An event delivered to one responder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A new emergency was offered to the recipient
    EmergencyReported {
        emergency_id: EmergencyId,
        category: CategoryKey,
        name: String,
        icon: IconSpec,
    },
    /// The recipient dispatched themselves; carries the destination
    DispatchedSelf {
        emergency_id: EmergencyId,
        x: i64,
        y: i64,
        z: i64,
    },
    /// Another responder dispatched to an emergency
    DispatchedOther {
        emergency_id: EmergencyId,
        emergency_name: String,
        responder: ResponderId,
        dispatched: u32,
        cap: u32,
    },
    /// The encounter generator picked the recipient for a synthetic incident
    EncounterTriggered,
    /// The recipient is now on duty in `unit_id`
    OnDuty { unit_id: UnitId },
    /// The recipient left `unit_id`
    OffDuty { unit_id: UnitId },
    /// Another responder joined the recipient's unit
    MemberJoined { unit_id: UnitId, member: ResponderId },
    /// Another responder left the recipient's unit
    MemberLeft { unit_id: UnitId, member: ResponderId },
    /// The recipient's unit fell below its minimum size and was disbanded
    UnitDisbanded { unit_id: UnitId },
}

impl DispatchEvent {
    /// Stable event name, matching the serialized `kind` tag
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::EmergencyReported { .. } => "emergency_reported",
            DispatchEvent::DispatchedSelf { .. } => "dispatched_self",
            DispatchEvent::DispatchedOther { .. } => "dispatched_other",
            DispatchEvent::EncounterTriggered => "encounter_triggered",
            DispatchEvent::OnDuty { .. } => "on_duty",
            DispatchEvent::OffDuty { .. } => "off_duty",
            DispatchEvent::MemberJoined { .. } => "member_joined",
            DispatchEvent::MemberLeft { .. } => "member_left",
            DispatchEvent::UnitDisbanded { .. } => "unit_disbanded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_serialized_tag() {
        let event = DispatchEvent::DispatchedOther {
            emergency_id: EmergencyId::new("e-1"),
            emergency_name: "Fire".into(),
            responder: ResponderId::new("alice"),
            dispatched: 1,
            cap: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], event.kind());
        assert_eq!(json["responder"], "alice");

        let json = serde_json::to_value(DispatchEvent::EncounterTriggered).unwrap();
        assert_eq!(json["kind"], "encounter_triggered");
    }
}
