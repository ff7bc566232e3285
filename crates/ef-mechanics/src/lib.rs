//! Game mechanics for Emberfall.
//!
//! Provides the stats and lifecycle pipeline (attribute aggregation,
//! derived health and mana, death, cheat-death and respawn), the player and
//! monster combat controllers, damage rolls, and read-only content lookup.
//! Everything here is a pure function of its inputs plus an injected `now`
//! and RNG; scheduling belongs to `ef-simulation`.

pub mod combat;
pub mod content;
pub mod error;
pub mod stats;

pub use combat::{CombatTuning, DamageScaling};
pub use content::{ContentLookup, ContentTable, MonsterArchetype, SkillDefinition};
pub use error::{MechError, MechResult};
pub use stats::{DamageOptions, LifecycleTuning, RespawnOptions};
