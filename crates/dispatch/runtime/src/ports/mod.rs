//! Collaborator ports for the dispatch engine
//!
//! The engine never talks to a host directly. Time, identity and
//! notification delivery all come in through these traits.

mod memory;
mod traits;

pub use memory::{InMemoryDirectory, ManualClock, RecordingSink};
pub use traits::{Clock, EligibilityProvider, NotificationSink, SystemClock, TracingSink};
