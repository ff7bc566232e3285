//! Monster target acquisition and windup attacks.
//!
//! The controller functions take the actor's `MonsterCombatComponent` by
//! `&mut` separately from the world, so a caller can lift it out of the
//! entity, run the controller against a shared `&World`, and put it back.
//!
//! State machine: `idle -> pursuing -> attacking -> idle | pursuing`.

use ef_core::component::{CombatMode, MonsterCombatComponent, PendingAttack};
use ef_core::entity::{Entity, EntityId};
use ef_core::grid::{Direction, TilePos};
use ef_core::world::World;
use rand::rngs::StdRng;

use super::damage::{self, DamageProfile, DamageScaling};
use crate::stats::{DamageOptions, DamageOutcome, LifecycleTuning, apply_damage};

/// Attacks connect only between orthogonal neighbours. A diagonal
/// neighbour sits at Manhattan distance two and is out of reach.
pub const MELEE_RANGE: u32 = 1;

/// A resolved hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackHit {
    /// Who was hit.
    pub target: EntityId,
    /// What the lifecycle pipeline did with the damage.
    pub outcome: DamageOutcome,
}

fn position(entity: &Entity) -> Option<TilePos> {
    entity.components.transform.as_ref().map(|t| t.position)
}

/// A target is viable when it is alive and standing in `scene`.
fn viable_target(entity: &Entity, scene: Option<&str>) -> Option<TilePos> {
    if !entity.is_alive() || entity.scene.as_deref() != scene {
        return None;
    }
    position(entity)
}

fn settle_mode(state: &mut MonsterCombatComponent) {
    state.mode = match (state.target, state.pending_attack) {
        (_, Some(_)) => CombatMode::Attacking,
        (Some(_), None) => CombatMode::Pursuing,
        (None, None) => CombatMode::Idle,
    };
}

/// Keep or acquire a target.
///
/// An existing target is kept while it is alive, in the same scene, and
/// within pursuit range. Otherwise players in the actor's scene are scanned
/// for the nearest live one within aggression range; ties go to the player
/// that entered the world first.
pub fn resolve_target(
    world: &World,
    actor: EntityId,
    state: &mut MonsterCombatComponent,
) -> Option<EntityId> {
    let Some(me) = world.get_entity(actor) else {
        state.target = None;
        settle_mode(state);
        return None;
    };
    let (Some(origin), Some(behaviour)) = (position(me), me.components.behaviour.as_ref()) else {
        state.target = None;
        settle_mode(state);
        return None;
    };
    let scene = me.scene.as_deref();

    if let Some(current) = state.target {
        let kept = world
            .get_entity(current)
            .and_then(|t| viable_target(t, scene))
            .is_some_and(|pos| origin.manhattan(pos) <= behaviour.pursuit_range);
        if kept {
            settle_mode(state);
            return Some(current);
        }
        tracing::debug!(monster = %actor, target = %current, "target lost");
        state.target = None;
    }

    let acquired = scene.and_then(|scene| {
        world
            .players_in_scene(scene)
            .into_iter()
            .filter_map(|p| viable_target(p, Some(scene)).map(|pos| (p.id, origin.manhattan(pos))))
            .filter(|(_, distance)| *distance <= behaviour.aggression_range)
            .min_by_key(|(_, distance)| *distance)
            .map(|(id, _)| id)
    });

    if let Some(target) = acquired {
        tracing::debug!(monster = %actor, target = %target, "target acquired");
    }
    state.target = acquired;
    settle_mode(state);
    acquired
}

/// Try to commit an attack on `target`.
///
/// Refused while an attack is pending, while the attack interval has not
/// elapsed since the last one, or when the target is not adjacent and
/// alive. On success the rolled damage is stored as the pending attack and
/// resolves `windup_ms` later.
pub fn try_attack(
    world: &World,
    actor: EntityId,
    state: &mut MonsterCombatComponent,
    target: EntityId,
    now: u64,
    rng: &mut StdRng,
    scaling: &DamageScaling,
) -> bool {
    if state.pending_attack.is_some() {
        return false;
    }

    let Some(me) = world.get_entity(actor).filter(|e| e.is_alive()) else {
        return false;
    };
    let (Some(behaviour), Some(monster)) = (
        me.components.behaviour.as_ref(),
        me.components.monster.as_ref(),
    ) else {
        return false;
    };

    if state
        .last_attack_at
        .is_some_and(|last| now < last + behaviour.attack_interval_ms)
    {
        return false;
    }

    let Some(origin) = position(me) else {
        return false;
    };
    let in_reach = world
        .get_entity(target)
        .and_then(|t| viable_target(t, me.scene.as_deref()))
        .is_some_and(|pos| origin.manhattan(pos) <= MELEE_RANGE);
    if !in_reach {
        return false;
    }

    let attributes = me
        .components
        .stats
        .as_ref()
        .map(|s| s.total())
        .unwrap_or_default();
    let profile = DamageProfile {
        range: monster.damage,
        attributes: &attributes,
        scaling,
        multiplier: behaviour.damage_multiplier,
        rarity: monster.rarity,
    };
    let damage = damage::roll(&profile, rng);

    state.pending_attack = Some(PendingAttack {
        target,
        resolve_at: now + behaviour.windup_ms,
        damage,
    });
    state.last_attack_at = Some(now);
    state.target = Some(target);
    settle_mode(state);
    tracing::debug!(monster = %actor, target = %target, damage, "attack wound up");
    true
}

/// Resolve the pending attack if it is due.
///
/// Either side may have moved, died, or left during the windup, so the
/// attacker's liveness and the target's adjacency and liveness are checked
/// again. Any invalid pending attack is cleared and
/// `None` is returned with no other effect.
pub fn resolve_pending_attack(
    world: &mut World,
    actor: EntityId,
    state: &mut MonsterCombatComponent,
    now: u64,
    tuning: &LifecycleTuning,
) -> Option<AttackHit> {
    let pending = state.pending_attack?;
    if now < pending.resolve_at {
        return None;
    }
    state.pending_attack = None;

    let hit = land_hit(world, actor, pending, now, tuning);
    match hit {
        Some(hit) if hit.outcome.is_fatal() => state.target = None,
        Some(_) => {}
        None => {
            tracing::debug!(monster = %actor, target = %pending.target, "pending attack fizzled");
        }
    }
    settle_mode(state);
    hit
}

fn land_hit(
    world: &mut World,
    actor: EntityId,
    pending: PendingAttack,
    now: u64,
    tuning: &LifecycleTuning,
) -> Option<AttackHit> {
    let me = world.get_entity(actor).filter(|e| e.is_alive())?;
    if me.components.stats.is_none() {
        return None;
    }
    let origin = position(me)?;
    let scene = me.scene.clone();

    let target = world.get_entity_mut(pending.target)?;
    let pos = viable_target(target, scene.as_deref())?;
    if origin.manhattan(pos) > MELEE_RANGE {
        return None;
    }

    let stats = target.components.stats.as_mut()?;
    let outcome = apply_damage(stats, pending.damage, DamageOptions::default(), tuning);
    target.mark_dirty(now);
    Some(AttackHit {
        target: pending.target,
        outcome,
    })
}

/// Direction of the next pursuit step, or `None` when already in reach.
pub fn pursuit_direction(world: &World, actor: EntityId, target: EntityId) -> Option<Direction> {
    let from = world.get_entity(actor).and_then(position)?;
    let to = world.get_entity(target).and_then(position)?;
    if from.manhattan(to) <= MELEE_RANGE {
        return None;
    }
    // Never onto the target's own tile; straight steps win ties.
    Direction::ALL
        .into_iter()
        .map(|d| (d, from.step(d)))
        .filter(|(_, next)| *next != to)
        .min_by_key(|(d, next)| (next.manhattan(to), d.is_diagonal()))
        .map(|(d, _)| d)
}

/// Whether an idle monster is due for a random step.
pub fn wander_due(
    world: &World,
    actor: EntityId,
    state: &MonsterCombatComponent,
    now: u64,
) -> bool {
    if state.mode != CombatMode::Idle {
        return false;
    }
    let Some(interval) = world
        .get_entity(actor)
        .and_then(|e| e.components.behaviour.as_ref())
        .and_then(|b| b.random_walk_interval_ms)
    else {
        return false;
    };
    state.last_wander_at.is_none_or(|last| now >= last + interval)
}
