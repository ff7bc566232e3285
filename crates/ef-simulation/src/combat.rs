//! Drives the monster combat controller each tick and fires the combat
//! effects the timer queue hands back.

use ef_core::component::{Action, ComponentKind, IntentSource, MonsterCombatComponent, MoveIntent};
use ef_core::entity::EntityId;
use ef_core::net::BroadcastOptions;
use ef_mechanics::combat::monster::{pursuit_direction, wander_due};
use ef_mechanics::combat::player::advance_animation;
use ef_mechanics::combat::{
    AnimationTimer, AttackHit, resolve_pending_attack, resolve_target, try_attack,
};
use ef_mechanics::stats::LifeTransition;
use serde_json::json;

use crate::action_queue::RANDOM_WALK;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;
use crate::timer::ScheduledEffect;

/// Target selection, attack windups, pursuit and idle wandering for every
/// entity carrying a `monster-combat` component.
#[derive(Debug, Default)]
pub struct CombatSystem;

impl CombatSystem {
    /// A combat system.
    pub fn new() -> Self {
        Self
    }

    fn run_monster(id: EntityId, ctx: &mut SimContext<'_>) {
        let Some(mut state) = take_state(ctx, id) else {
            return;
        };
        if ctx.world.get_entity(id).is_some_and(|e| e.is_alive()) {
            Self::decide(id, &mut state, ctx);
        }
        put_state(ctx, id, state);
    }

    fn decide(id: EntityId, state: &mut MonsterCombatComponent, ctx: &mut SimContext<'_>) {
        let now = ctx.now();
        let previous = state.target;
        let target = resolve_target(ctx.world, id, state);

        if previous != target {
            if let Some(lost) = previous {
                let description = format!("{} lost its target", ctx_name(ctx, id));
                ctx.emit(
                    SimEventKind::TargetLost {
                        entity: id,
                        target: lost,
                    },
                    description,
                );
            }
            if let Some(acquired) = target {
                let description =
                    format!("{} targets {}", ctx_name(ctx, id), ctx_name(ctx, acquired));
                ctx.emit(
                    SimEventKind::TargetAcquired {
                        entity: id,
                        target: acquired,
                    },
                    description,
                );
            }
        }

        let Some(target) = target else {
            if wander_due(ctx.world, id, state, now) {
                state.last_wander_at = Some(now);
                if let Some(queue) = ctx
                    .world
                    .get_entity_mut(id)
                    .and_then(|e| e.components.action_queue.as_mut())
                {
                    queue.enqueue(Action::ai(RANDOM_WALK));
                }
            }
            return;
        };

        if state.pending_attack.is_some() {
            return;
        }

        let scaling = ctx.config.damage;
        if try_attack(ctx.world, id, state, target, now, ctx.rng, &scaling) {
            let Some(pending) = state.pending_attack else {
                return;
            };
            ctx.schedule(
                pending.resolve_at,
                ScheduledEffect::ResolveAttack {
                    entity: id,
                    resolve_at: pending.resolve_at,
                },
            );
            broadcast_from(
                ctx,
                id,
                "attack",
                json!({
                    "id": id,
                    "target": target,
                    "resolve_at": pending.resolve_at,
                }),
            );
            let description = format!("{} winds up", ctx_name(ctx, id));
            ctx.emit(
                SimEventKind::AttackCommitted {
                    entity: id,
                    target,
                    damage: pending.damage,
                },
                description,
            );
            return;
        }

        // Not in reach: close the distance one step at a time.
        let Some(direction) = pursuit_direction(ctx.world, id, target) else {
            return;
        };
        if let Some(intents) = ctx
            .world
            .get_entity_mut(id)
            .and_then(|e| e.components.movement_intent.as_mut())
        {
            if intents.queue.is_empty() {
                intents.push(MoveIntent::new(direction).from_source(IntentSource::Pursuit));
            }
        }
    }
}

fn take_state(ctx: &mut SimContext<'_>, id: EntityId) -> Option<MonsterCombatComponent> {
    ctx.world
        .get_entity_mut(id)
        .and_then(|e| e.components.monster_combat.take())
}

fn put_state(ctx: &mut SimContext<'_>, id: EntityId, state: MonsterCombatComponent) {
    if let Some(entity) = ctx.world.get_entity_mut(id) {
        entity.components.monster_combat = Some(state);
    }
}

fn ctx_name(ctx: &SimContext<'_>, id: EntityId) -> String {
    ctx.world.entity_name(id)
}

/// Broadcast `<actor>:<event>` through the entity's own broadcaster.
fn broadcast_from(ctx: &SimContext<'_>, id: EntityId, event: &str, payload: serde_json::Value) {
    let Some(entity) = ctx.world.get_entity(id) else {
        return;
    };
    if let (Some(net), Some(actor)) = (entity.components.networking.as_ref(), entity.actor()) {
        net.broadcaster.broadcast(
            &actor.channel(event),
            payload,
            None,
            &BroadcastOptions::stamped(ctx.now()),
        );
    }
}

/// Fire a scheduled attack resolution.
pub(crate) fn on_resolve_attack(ctx: &mut SimContext<'_>, id: EntityId, resolve_at: u64) {
    let now = ctx.now();
    let Some(mut state) = take_state(ctx, id) else {
        return;
    };
    if state.pending_attack.map(|p| p.resolve_at) != Some(resolve_at) {
        tracing::trace!(entity = %id, resolve_at, "stale attack resolution dropped");
        put_state(ctx, id, state);
        return;
    }

    let lifecycle = ctx.config.lifecycle;
    let hit = resolve_pending_attack(ctx.world, id, &mut state, now, &lifecycle);
    put_state(ctx, id, state);

    match hit {
        Some(hit) => report_hit(ctx, id, hit),
        None => {
            let description = format!("{}'s attack fizzled", ctx_name(ctx, id));
            ctx.emit(SimEventKind::AttackFizzled { entity: id }, description);
        }
    }
}

fn report_hit(ctx: &mut SimContext<'_>, id: EntityId, hit: AttackHit) {
    let AttackHit { target, outcome } = hit;
    broadcast_from(
        ctx,
        target,
        "damage",
        json!({
            "id": target,
            "source": id,
            "amount": outcome.applied,
            "health": outcome.health,
            "state": outcome.state,
        }),
    );
    let description = format!(
        "{} hits {} for {}",
        ctx_name(ctx, id),
        ctx_name(ctx, target),
        outcome.applied
    );
    ctx.emit(
        SimEventKind::AttackResolved {
            entity: id,
            target,
            applied: outcome.applied,
        },
        description,
    );

    match outcome.transition {
        Some(LifeTransition::CheatDeath) => {
            tracing::info!(entity = %target, "cheat death");
            let description = format!("{} cheats death", ctx_name(ctx, target));
            ctx.emit(SimEventKind::CheatDeath { entity: target }, description);
        }
        Some(transition @ (LifeTransition::Died | LifeTransition::Permadeath)) => {
            tracing::info!(entity = %target, ?transition, "entity died");
            broadcast_from(
                ctx,
                target,
                "death",
                json!({ "id": target, "permanent": transition == LifeTransition::Permadeath }),
            );
            let description = format!("{} died", ctx_name(ctx, target));
            let cause = ctx_name(ctx, id);
            ctx.emit(
                SimEventKind::EntityDied {
                    entity: target,
                    cause,
                },
                description,
            );
        }
        None => {}
    }
}

/// Fire a scheduled animation transition.
pub(crate) fn on_animation_advance(ctx: &mut SimContext<'_>, id: EntityId, timer: AnimationTimer) {
    let tuning = ctx.config.combat;
    let next = ctx
        .world
        .get_entity_mut(id)
        .and_then(|e| e.components.animation.as_mut())
        .and_then(|anim| advance_animation(anim, timer, &tuning));
    if let Some(next) = next {
        ctx.schedule(
            next.due_at,
            ScheduledEffect::AnimationAdvance {
                entity: id,
                timer: next,
            },
        );
    }
}

impl System for CombatSystem {
    fn name(&self) -> &str {
        "combat"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for id in ctx.world.query(ComponentKind::MonsterCombat) {
            Self::run_monster(id, ctx);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
