//! Port trait definitions

use chrono::{DateTime, Utc};
use dispatch_types::{Capability, DispatchEvent, ResponderId};
use tracing::info;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Answers online, capability and eligibility questions about responders.
///
/// Identity and session validity are owned by the provider; the engine
/// treats every answer as authoritative for the current instant.
pub trait EligibilityProvider: Send + Sync {
    /// Whether the responder currently has a live session
    fn is_online(&self, responder: &ResponderId) -> bool;

    /// Whether the responder carries a capability flag
    fn has_capability(&self, responder: &ResponderId, capability: Capability) -> bool;

    /// Host-specific eligibility (tags, AFK state). `None` means unknown,
    /// which does not block dispatch.
    fn external_eligibility(&self, _responder: &ResponderId) -> Option<bool> {
        None
    }

    /// Every online identity, in the provider's enumeration order
    fn online_responders(&self) -> Vec<ResponderId>;

    /// Online, not opted out, and not rejected by the external predicate
    fn is_eligible(&self, responder: &ResponderId) -> bool {
        self.is_online(responder)
            && !self.has_capability(responder, Capability::NeverAvailable)
            && self.external_eligibility(responder) != Some(false)
    }
}

/// Fire-and-forget delivery of events to responders
pub trait NotificationSink: Send + Sync {
    fn notify(&self, recipient: &ResponderId, event: &DispatchEvent);
}

/// Sink that only logs deliveries, for hosts without a notification channel
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, recipient: &ResponderId, event: &DispatchEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(
            recipient = %recipient,
            kind = event.kind(),
            payload = %payload,
            "Dispatch notification"
        );
    }
}
