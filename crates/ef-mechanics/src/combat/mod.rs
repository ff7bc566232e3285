//! Real-time combat controllers.
//!
//! Players commit skill inputs gated by a global cooldown; monsters acquire
//! targets over a radius and attack with a windup. Both sides leave the
//! timing to the caller: functions return what needs scheduling and the
//! simulation's timer queue fires it later.

pub mod damage;
pub mod monster;
pub mod player;

pub use damage::{DamageProfile, DamageScaling};
pub use monster::{AttackHit, resolve_pending_attack, resolve_target, try_attack};
pub use player::{AcceptedInput, AnimationTimer, CombatTuning, matches_combo, record_skill_input};
