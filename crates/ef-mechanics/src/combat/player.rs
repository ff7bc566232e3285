//! Player skill input and the attack animation state machine.
//!
//! The client is untrusted: inputs arriving inside the global cooldown are
//! dropped, and every accepted input is stamped with a server sequence.

use ef_core::component::{AnimationComponent, AnimationState, PlayerCombatComponent, SkillInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timing for player combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Minimum spacing between two accepted skill inputs.
    pub global_cooldown_ms: u64,
    /// How far back the input history reaches.
    pub history_window_ms: u64,
    /// Length of the attack clip before the hold pose.
    pub attack_animation_ms: u64,
    /// How long the hold pose lasts before returning to idle.
    pub hold_ms: u64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            global_cooldown_ms: 350,
            history_window_ms: 3_000,
            attack_animation_ms: 300,
            hold_ms: 250,
        }
    }
}

impl CombatTuning {
    /// Set the global cooldown.
    pub fn with_global_cooldown_ms(mut self, ms: u64) -> Self {
        self.global_cooldown_ms = ms;
        self
    }

    /// Set the attack clip length.
    pub fn with_attack_animation_ms(mut self, ms: u64) -> Self {
        self.attack_animation_ms = ms;
        self
    }

    /// Set the hold length.
    pub fn with_hold_ms(mut self, ms: u64) -> Self {
        self.hold_ms = ms;
        self
    }
}

/// A scheduled animation transition. Applies only while the animation's
/// sequence still equals `sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTimer {
    /// The animation sequence captured when scheduling.
    pub sequence: u64,
    /// When the transition is due.
    pub due_at: u64,
}

/// What an accepted skill input produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedInput {
    /// Server-assigned input sequence.
    pub sequence: u64,
    /// When the next input will be accepted.
    pub cooldown_until: u64,
    /// The follow-up animation transition to schedule, if the entity animates.
    pub animation: Option<AnimationTimer>,
}

/// Record a skill input.
///
/// Returns `None` when the input lands inside the global cooldown. On
/// acceptance the input is stamped, the cooldown restarts, the history is
/// trimmed to the window, and the attack animation starts.
pub fn record_skill_input(
    combat: &mut PlayerCombatComponent,
    animation: Option<&mut AnimationComponent>,
    skill_id: &str,
    data: Value,
    now: u64,
    tuning: &CombatTuning,
) -> Option<AcceptedInput> {
    if now < combat.global_cooldown_until {
        tracing::debug!(
            skill = skill_id,
            now,
            cooldown_until = combat.global_cooldown_until,
            "skill input rejected: global cooldown"
        );
        return None;
    }

    combat.sequence += 1;
    combat.global_cooldown_until = now + tuning.global_cooldown_ms;
    combat.history.push_back(SkillInput {
        skill_id: skill_id.to_string(),
        sequence: combat.sequence,
        at: now,
        data,
    });
    prune_history(combat, now, tuning.history_window_ms);

    let animation = animation.map(|anim| play_attack(anim, skill_id, now, tuning));

    Some(AcceptedInput {
        sequence: combat.sequence,
        cooldown_until: combat.global_cooldown_until,
        animation,
    })
}

/// Drop history entries older than `window_ms`.
pub fn prune_history(combat: &mut PlayerCombatComponent, now: u64, window_ms: u64) {
    let cutoff = now.saturating_sub(window_ms);
    while combat.history.front().is_some_and(|i| i.at < cutoff) {
        combat.history.pop_front();
    }
}

/// Whether the most recent inputs spell out `combo`, oldest first.
pub fn matches_combo(combat: &PlayerCombatComponent, combo: &[&str]) -> bool {
    if combo.is_empty() || combo.len() > combat.history.len() {
        return false;
    }
    let skip = combat.history.len() - combo.len();
    combat
        .history
        .iter()
        .skip(skip)
        .zip(combo)
        .all(|(input, id)| input.skill_id == *id)
}

/// Start the attack clip. Returns the timer that moves it to the hold pose.
pub fn play_attack(
    animation: &mut AnimationComponent,
    clip: &str,
    now: u64,
    tuning: &CombatTuning,
) -> AnimationTimer {
    animation.sequence += 1;
    animation.state = AnimationState::Attack;
    animation.clip = Some(clip.to_string());
    let due_at = now + tuning.attack_animation_ms;
    animation.hold_until = Some(due_at);
    AnimationTimer {
        sequence: animation.sequence,
        due_at,
    }
}

/// Fire a scheduled animation transition.
///
/// A timer whose sequence no longer matches was superseded by a newer
/// animation and does nothing. `attack` moves to `hold` and returns the
/// timer for the final revert; `hold` returns to `idle`.
pub fn advance_animation(
    animation: &mut AnimationComponent,
    timer: AnimationTimer,
    tuning: &CombatTuning,
) -> Option<AnimationTimer> {
    if animation.sequence != timer.sequence {
        tracing::trace!(
            expected = timer.sequence,
            actual = animation.sequence,
            "stale animation timer dropped"
        );
        return None;
    }

    match animation.state {
        AnimationState::Attack => {
            animation.state = AnimationState::Hold;
            let due_at = timer.due_at + tuning.hold_ms;
            animation.hold_until = Some(due_at);
            Some(AnimationTimer {
                sequence: timer.sequence,
                due_at,
            })
        }
        AnimationState::Hold => {
            animation.state = AnimationState::Idle;
            animation.clip = None;
            animation.hold_until = None;
            None
        }
        AnimationState::Idle => None,
    }
}
