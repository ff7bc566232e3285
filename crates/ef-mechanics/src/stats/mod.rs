//! Attribute aggregation, derived resources, and the life cycle.
//!
//! The data lives on `ef_core::stats::StatsComponent`; everything here is a
//! free function over it so the simulation can call in with a plain
//! `&mut` borrow of one entity's stats.

pub mod formula;
pub mod lifecycle;

pub use formula::{LifecycleTuning, ResourceFormula, initialise, recalculate};
pub use lifecycle::{
    DamageOptions, DamageOutcome, LifeTransition, RespawnOptions, RespawnOutcome, apply_damage,
    apply_healing, try_respawn,
};
