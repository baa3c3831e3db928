//! Dispatch Runtime
//!
//! This crate provides the scheduling engine that matches on-duty units of
//! responders against reported emergencies, and that manufactures
//! encounters when real reports are scarce.
//!
//! # Architecture
//!
//! The [`DispatchCenter`] is the main entry point. It owns all dispatch state
//! and composes specialized components:
//!
//! - [`CategoryCatalog`]: Immutable emergency categories, normalized from configuration
//! - [`EmergencyRegistry`]: Live emergencies, responder assignment and slot accounting
//! - [`UnitRegistry`]: Units, per-responder cooldowns, availability and dispatch order
//! - [`EncounterScheduler`]: Freeze window and the synthetic encounter cycle
//!
//! Collaborators are reached through ports: a [`Clock`], an
//! [`EligibilityProvider`] and a [`NotificationSink`].
//! [`DispatchService`] hosts a center on tokio, running the encounter
//! ticker and departure grace timers.
//!
//! # Key Invariants
//!
//! 1. A responder serves in at most one unit
//! 2. Units that shrink to the disband size are removed
//! 3. Expired emergencies never count toward open dispatch slots
//! 4. Rejected operations change nothing
//!
//! # Example
//!
//! ```rust
//! use dispatch_runtime::{DispatchCenter, InMemoryDirectory, RecordingSink};
//! use dispatch_types::{CategoryConfig, DispatchConfig, Location, ResponderId};
//! use chrono::Duration;
//! use std::sync::Arc;
//!
//! let config = DispatchConfig::default()
//!     .with_category("fire", CategoryConfig::new("Fire").with_cap(2));
//! let directory = Arc::new(InMemoryDirectory::with_online(vec![
//!     ResponderId::new("alice"),
//!     ResponderId::new("bob"),
//! ]));
//! let mut center = DispatchCenter::new(&config, directory, Arc::new(RecordingSink::new()));
//!
//! assert!(center.add_unit(vec![ResponderId::new("alice"), ResponderId::new("bob")]));
//!
//! let emergency = center
//!     .report("fire", ResponderId::new("carol"), Location::new("world", 0.0, 64.0, 0.0), Duration::zero())
//!     .unwrap();
//! assert_eq!(emergency.assigned_responders.len(), 2);
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod context;
pub mod cooldown;
pub mod dispatch_center;
pub mod emergency_registry;
pub mod encounter_scheduler;
pub mod ports;
pub mod service;
pub mod unit_registry;

// Re-export main types for convenience
pub use catalog::{load_config_or_default, CategoryCatalog};
pub use context::DispatchContext;
pub use cooldown::random_cooldown;
pub use dispatch_center::DispatchCenter;
pub use emergency_registry::EmergencyRegistry;
pub use encounter_scheduler::{EncounterOutcome, EncounterScheduler};
pub use ports::{
    Clock, EligibilityProvider, InMemoryDirectory, ManualClock, NotificationSink, RecordingSink,
    SystemClock, TracingSink,
};
pub use service::{DispatchService, SharedCenter};
pub use unit_registry::{UnitRegistry, UNAVAILABLE};
