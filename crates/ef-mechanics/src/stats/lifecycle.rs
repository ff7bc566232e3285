//! The life/death/respawn state machine.
//!
//! Health only ever reaches zero through [`apply_damage`]'s death
//! transition. Callers outside this module use the pool's clamped
//! `restore`/`set_max` helpers or these functions, never a raw assignment.

use ef_core::stats::{LifeState, LifecycleMode, StatsComponent};
use serde::{Deserialize, Serialize};

use super::formula::LifecycleTuning;

/// Options for [`apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOptions {
    /// Let a lethal hit spend a cheat-death charge instead of killing.
    pub allow_cheat_death: bool,
}

impl Default for DamageOptions {
    fn default() -> Self {
        Self {
            allow_cheat_death: true,
        }
    }
}

/// A life-state change caused by damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifeTransition {
    /// A charge was spent and the character survived at the floor.
    CheatDeath,
    /// The character died and may respawn.
    Died,
    /// The character died with no lives left.
    Permadeath,
}

/// What [`apply_damage`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// Health actually removed.
    pub applied: u32,
    /// Health after the hit.
    pub health: u32,
    /// Life state after the hit.
    pub state: LifeState,
    /// Set when the hit changed the life state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<LifeTransition>,
}

impl DamageOutcome {
    fn unchanged(stats: &StatsComponent) -> Self {
        Self {
            applied: 0,
            health: stats.health.current,
            state: stats.life.state,
            transition: None,
        }
    }

    /// Whether the hit took the character out of the world.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.transition,
            Some(LifeTransition::Died | LifeTransition::Permadeath)
        )
    }
}

/// Apply `amount` damage through the lifecycle pipeline.
///
/// Damage to a character that is not alive is ignored. A lethal hit spends a
/// cheat-death charge when one is available and allowed; otherwise the
/// character dies, spending a life in hard mode.
pub fn apply_damage(
    stats: &mut StatsComponent,
    amount: u32,
    options: DamageOptions,
    tuning: &LifecycleTuning,
) -> DamageOutcome {
    if !stats.life.state.is_alive() || amount == 0 {
        return DamageOutcome::unchanged(stats);
    }

    let before = stats.health.current;
    if amount < before {
        let applied = stats.health.drain(amount);
        return DamageOutcome {
            applied,
            health: stats.health.current,
            state: stats.life.state,
            transition: None,
        };
    }

    if options.allow_cheat_death && stats.life.cheat_death_charges > 0 {
        stats.life.cheat_death_charges -= 1;
        let floor = tuning.cheat_death_floor.max(1);
        stats.health.set_current(floor);
        stats.life.state = LifeState::CheatDeath;
        tracing::debug!(
            charges_left = stats.life.cheat_death_charges,
            health = stats.health.current,
            "cheat-death triggered"
        );
        return DamageOutcome {
            applied: before.saturating_sub(stats.health.current),
            health: stats.health.current,
            state: stats.life.state,
            transition: Some(LifeTransition::CheatDeath),
        };
    }

    let applied = stats.health.drain(before);
    let transition = match stats.life.mode {
        LifecycleMode::Soft => {
            stats.life.state = LifeState::AwaitingRespawn;
            LifeTransition::Died
        }
        LifecycleMode::Hard => {
            stats.life.lives_remaining = stats.life.lives_remaining.saturating_sub(1);
            if stats.life.lives_remaining == 0 {
                stats.life.state = LifeState::Permadead;
                LifeTransition::Permadeath
            } else {
                stats.life.state = LifeState::AwaitingRespawn;
                LifeTransition::Died
            }
        }
    };
    tracing::debug!(state = %stats.life.state, "character died");

    DamageOutcome {
        applied,
        health: 0,
        state: stats.life.state,
        transition: Some(transition),
    }
}

/// Heal up to `amount`, clamped at the maximum. Returns the health gained.
///
/// Healing does nothing for a dead character. Any healing ends the
/// cheat-death state.
pub fn apply_healing(stats: &mut StatsComponent, amount: u32) -> u32 {
    if !stats.life.state.is_alive() {
        return 0;
    }
    let gained = stats.health.restore(amount);
    if gained > 0 && stats.life.state == LifeState::CheatDeath {
        stats.life.state = LifeState::Alive;
    }
    gained
}

/// Options for [`try_respawn`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RespawnOptions {
    /// Respawn even a permadead or living character.
    pub force: bool,
}

/// What [`try_respawn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnOutcome {
    /// Whether the character is back in the world.
    pub success: bool,
    /// Life state afterwards.
    pub state: LifeState,
    /// Health afterwards.
    pub health: u32,
}

/// Bring a dead character back with a fraction of maximum health.
///
/// Fails for a permadead character unless forced. A living character has
/// nothing to respawn from and also fails unless forced.
pub fn try_respawn(
    stats: &mut StatsComponent,
    options: RespawnOptions,
    tuning: &LifecycleTuning,
) -> RespawnOutcome {
    let blocked = match stats.life.state {
        LifeState::AwaitingRespawn => false,
        LifeState::Permadead | LifeState::Alive | LifeState::CheatDeath => !options.force,
    };
    if blocked {
        return RespawnOutcome {
            success: false,
            state: stats.life.state,
            health: stats.health.current,
        };
    }

    let restored = (f64::from(stats.health.max) * tuning.respawn_fraction).ceil() as u32;
    stats.health.set_current(restored.max(1));
    if stats.life.state == LifeState::Permadead {
        stats.life.lives_remaining = stats.life.lives_remaining.max(1);
    }
    stats.life.state = LifeState::Alive;

    RespawnOutcome {
        success: true,
        state: stats.life.state,
        health: stats.health.current,
    }
}
