//! Domain layer: aggregates, value objects, events and the pure business
//! rules (pricing and tiering) that operate on them.

pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;
