//! Dispatch Domain Types
//!
//! This crate defines the domain types for the emergency dispatch engine:
//! responders grouped into units, emergencies reported against a catalog of
//! categories, and the notification payloads delivered to responders.
//!
//! # Key Concepts
//!
//! - **Emergency**: a reported incident with a category, a location and an
//!   activation window. It expires once its category duration has elapsed.
//! - **Unit**: a group of responders dispatched together. A responder
//!   belongs to at most one unit.
//! - **Dispatch cap / par**: the most responders an emergency can absorb,
//!   and the count it needs to be considered adequately handled.
//! - **Cooldown**: a sampled interval before a responder (or the encounter
//!   generator) is eligible again.
//!
//! # Architecture
//!
//! This is a pure types crate. Runtime behaviour (registries, ordering,
//! scheduling) lives in `dispatch-runtime`. IDs use the newtype pattern
//! and implement `Display`, `new()`, and `generate()` where they are
//! process-assigned.

#![deny(unsafe_code)]

mod capability;
mod category;
mod config;
mod cooldown;
mod emergency;
mod errors;
mod event;
mod ids;
mod unit;

pub use capability::*;
pub use category::*;
pub use config::*;
pub use cooldown::*;
pub use emergency::*;
pub use errors::*;
pub use event::*;
pub use ids::*;
pub use unit::*;
