//! The movement system: one queued step per entity per tick, then a
//! deduplicated broadcast of whatever changed.

use ef_core::capability::StepRequest;
use ef_core::component::{ComponentKind, MoveIntent, MovementSignature};
use ef_core::entity::EntityId;
use ef_core::grid::TilePos;
use ef_core::net::BroadcastOptions;
use serde_json::json;

use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Result of one step attempt.
#[derive(Debug, Clone, Copy)]
struct StepAttempt {
    intent: MoveIntent,
    moved: bool,
    turned: bool,
    position: TilePos,
}

/// Advances movement intents through each entity's movement handler.
///
/// Capability is decided by component presence: anything with a
/// `movement-state` and a `transform` can be moved, whatever its actor kind.
#[derive(Debug, Default)]
pub struct MovementSystem {
    broadcasts: u64,
}

impl MovementSystem {
    /// A movement system with no broadcasts sent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Movement broadcasts sent since the system was created.
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts
    }

    fn attempt(id: EntityId, ctx: &mut SimContext<'_>) -> Option<StepAttempt> {
        let now = ctx.now();
        let base_step_ms = ctx.config.movement.base_step_ms;
        let (entity, terrain) = ctx.world.entity_and_terrain_mut(id)?;
        if !entity.is_alive() {
            return None;
        }

        let attempt = {
            let c = &mut entity.components;
            let (Some(transform), Some(intents), Some(state)) = (
                c.transform.as_mut(),
                c.movement_intent.as_mut(),
                c.movement_state.as_mut(),
            ) else {
                return None;
            };

            if !transform.step.is_finished(now) {
                return None;
            }
            intents.current = None;
            let intent = intents.queue.pop_front()?;
            intents.current = Some(intent);
            state.last_intent_type = Some(intent.source);

            let facing_before = transform.facing;
            let moved = state.handler.step(StepRequest {
                transform: &mut *transform,
                direction: intent.direction,
                terrain,
                base_step_ms,
                now,
            });

            if moved {
                intents.last = Some(intent);
            } else {
                intents.current = None;
                if intent.requeue_on_fail {
                    intents.queue.push_front(intent);
                }
            }

            StepAttempt {
                intent,
                moved,
                turned: transform.facing != facing_before,
                position: transform.position,
            }
        };

        if attempt.moved {
            entity.mark_dirty(now);
        } else if attempt.turned {
            if let Some(net) = entity.components.networking.as_mut() {
                net.force_broadcast = true;
            }
        }
        Some(attempt)
    }

    /// Broadcast the entity's movement if its signature advanced past the
    /// last one sent, or a broadcast was forced.
    fn broadcast(&mut self, id: EntityId, ctx: &mut SimContext<'_>) {
        let now = ctx.now();
        let Some(entity) = ctx.world.get_entity_mut(id) else {
            return;
        };
        let c = &mut entity.components;
        let (Some(transform), Some(state), Some(net)) = (
            c.transform.as_ref(),
            c.movement_state.as_mut(),
            c.networking.as_mut(),
        ) else {
            return;
        };

        let signature = MovementSignature::from(&transform.step);
        let advanced =
            signature.sequence > 0 && state.last_broadcast.is_none_or(|last| signature > last);
        if !advanced && !net.force_broadcast {
            return;
        }

        let payload = json!({
            "id": id,
            "x": transform.position.x,
            "y": transform.position.y,
            "facing": transform.facing,
            "sequence": transform.step.sequence,
            "started_at": transform.step.started_at,
            "duration_ms": transform.step.duration_ms,
            "direction": transform.step.direction,
            "blocked": transform.step.blocked,
            "player_index": state.player_index,
        });
        net.broadcaster
            .broadcast(&net.channel, payload, None, &BroadcastOptions::stamped(now));
        net.force_broadcast = false;
        if advanced {
            state.last_broadcast = Some(signature);
        }
        self.broadcasts += 1;
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for id in ctx.world.query(ComponentKind::MovementState) {
            if let Some(attempt) = Self::attempt(id, ctx) {
                let name = ctx.world.entity_name(id);
                if attempt.moved {
                    ctx.emit(
                        SimEventKind::Moved {
                            entity: id,
                            to: attempt.position,
                        },
                        format!("{name} moved to {}", attempt.position),
                    );
                } else {
                    tracing::debug!(
                        entity = %id,
                        direction = %attempt.intent.direction,
                        "step blocked"
                    );
                    ctx.emit(
                        SimEventKind::Blocked {
                            entity: id,
                            direction: attempt.intent.direction,
                        },
                        format!("{name} blocked"),
                    );
                }
            }
            self.broadcast(id, ctx);
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
