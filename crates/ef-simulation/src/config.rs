use ef_core::capability::DEFAULT_STEP_MS;
use ef_mechanics::combat::{CombatTuning, DamageScaling};
use ef_mechanics::stats::LifecycleTuning;
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::telemetry::TracingConfig;

/// Movement timing and path search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Time to cross one tile orthogonally.
    pub base_step_ms: u64,
    /// Upper bound on tiles visited by one path search.
    pub max_path_nodes: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_step_ms: DEFAULT_STEP_MS,
            max_path_nodes: 4_096,
        }
    }
}

/// Throttle for direct player saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Minimum milliseconds between two direct saves of one player.
    pub player_save_cooldown_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            player_save_cooldown_ms: 5_000,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Default tick length in milliseconds.
    pub tick_ms: u64,
    /// Clock reading at tick 0.
    pub start_ms: u64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Step timing.
    pub movement: MovementConfig,
    /// Player save throttle.
    pub persistence: PersistenceConfig,
    /// Combat timing and cooldowns.
    pub combat: CombatTuning,
    /// Death, cheat-death and respawn tuning.
    pub lifecycle: LifecycleTuning,
    /// Monster damage scaling.
    pub damage: DamageScaling,
    /// Logging setup.
    pub tracing: TracingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_ms: 50,
            start_ms: 0,
            max_events: 0,
            movement: MovementConfig::default(),
            persistence: PersistenceConfig::default(),
            combat: CombatTuning::default(),
            lifecycle: LifecycleTuning::default(),
            damage: DamageScaling::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(text: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.lifecycle.validate()?;
        Ok(config)
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the default tick length.
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    /// Set the clock reading at tick 0.
    pub fn with_start_ms(mut self, ms: u64) -> Self {
        self.start_ms = ms;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the duration of an orthogonal step.
    pub fn with_base_step_ms(mut self, ms: u64) -> Self {
        self.movement.base_step_ms = ms;
        self
    }

    /// Set the direct player save throttle.
    pub fn with_player_save_cooldown_ms(mut self, ms: u64) -> Self {
        self.persistence.player_save_cooldown_ms = ms;
        self
    }

    /// Set combat timing.
    pub fn with_combat(mut self, combat: CombatTuning) -> Self {
        self.combat = combat;
        self
    }

    /// Set lifecycle tuning.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleTuning) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Set logging options.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn config_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.movement.base_step_ms, 150);
        assert_eq!(config.persistence.player_save_cooldown_ms, 5_000);
        assert_eq!(config.combat.global_cooldown_ms, 350);
    }

    #[test]
    fn config_builder_chain() {
        let config = SimConfig::default()
            .with_seed(123)
            .with_tick_ms(100)
            .with_start_ms(1_000)
            .with_max_events(500)
            .with_base_step_ms(200);
        assert_eq!(config.seed, 123);
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.start_ms, 1_000);
        assert_eq!(config.max_events, 500);
        assert_eq!(config.movement.base_step_ms, 200);
    }

    #[test]
    fn config_from_partial_json() {
        let config = SimConfig::from_json(
            r#"{"seed": 7, "movement": {"base_step_ms": 120}, "combat": {"global_cooldown_ms": 500}}"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.movement.base_step_ms, 120);
        assert_eq!(config.movement.max_path_nodes, 4_096);
        assert_eq!(config.combat.global_cooldown_ms, 500);
        assert_eq!(config.combat.history_window_ms, 3_000);
    }

    #[test]
    fn config_rejects_bad_json() {
        assert!(matches!(
            SimConfig::from_json("{\"seed\": \"many\"}"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn config_rejects_bad_tuning() {
        assert!(matches!(
            SimConfig::from_json(r#"{"lifecycle": {"respawn_fraction": 3.0}}"#),
            Err(SimError::Mechanics(_))
        ));
    }
}
