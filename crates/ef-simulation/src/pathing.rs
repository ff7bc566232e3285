//! Multi-tile walks.
//!
//! A walk is a cheapest-time path fed to the movement system one step at
//! a time by scheduled `WalkStep` effects. Each effect carries the walk id
//! it was scheduled under; starting a new walk or cancelling bumps the id
//! so older effects fall through.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use ef_core::capability::{MovementHandler, step_duration};
use ef_core::component::{Action, ComponentKind, IntentSource, MoveIntent};
use ef_core::entity::EntityId;
use ef_core::grid::{Direction, TilePos};
use ef_core::net::BroadcastOptions;
use ef_core::terrain::Terrain;
use ef_core::world::World;
use serde_json::json;

use crate::action_queue::ActionDispatcher;
use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::timer::ScheduledEffect;

/// Text sent to a player whose walk target has no path.
pub const UNREACHABLE_MESSAGE: &str = "you can't reach that";

/// Edge weights scale with step time, so a diagonal costs about 1.41
/// straight steps and straight lines stay straight.
const PATH_COST_BASE: u64 = 100;

/// Find the quickest 8-way path from `from` to `to`.
///
/// Returns the directions to take in order, an empty list when already
/// there, or `None` when the target cannot be entered or no path exists
/// within `max_nodes` settled tiles. Equal-cost routes resolve in
/// [`Direction::ALL`] order.
pub fn find_path(
    terrain: &Terrain,
    handler: &dyn MovementHandler,
    from: TilePos,
    to: TilePos,
    max_nodes: usize,
) -> Option<Vec<Direction>> {
    if from == to {
        return Some(Vec::new());
    }
    if !terrain.is_walkable(to) {
        return None;
    }

    let mut best: HashMap<TilePos, u64> = HashMap::from([(from, 0)]);
    let mut came_from: HashMap<TilePos, (TilePos, Direction)> = HashMap::new();
    let mut frontier = BinaryHeap::from([Reverse((0u64, 0u64, from))]);
    let mut pushed = 0u64;
    let mut settled = 0usize;

    while let Some(Reverse((cost, _, current))) = frontier.pop() {
        if current == to {
            return Some(reconstruct(&came_from, from, to));
        }
        if best.get(&current).is_some_and(|&known| cost > known) {
            continue;
        }
        settled += 1;
        if settled > max_nodes {
            tracing::debug!(%from, %to, max_nodes, "path search exhausted");
            return None;
        }
        for direction in Direction::ALL {
            let next = current.step(direction);
            if !handler.can_enter(current, next, terrain) {
                continue;
            }
            let next_cost = cost + step_duration(direction, PATH_COST_BASE);
            if best.get(&next).is_some_and(|&known| known <= next_cost) {
                continue;
            }
            best.insert(next, next_cost);
            came_from.insert(next, (current, direction));
            pushed += 1;
            frontier.push(Reverse((next_cost, pushed, next)));
        }
    }
    None
}

fn reconstruct(
    came_from: &HashMap<TilePos, (TilePos, Direction)>,
    from: TilePos,
    to: TilePos,
) -> Vec<Direction> {
    let mut steps = Vec::new();
    let mut at = to;
    while at != from {
        let Some(&(prev, direction)) = came_from.get(&at) else {
            break;
        };
        steps.push(direction);
        at = prev;
    }
    steps.reverse();
    steps
}

fn drop_path_intents(world: &mut World, entity: EntityId) {
    if let Some(intents) = world
        .get_entity_mut(entity)
        .and_then(|e| e.components.movement_intent.as_mut())
    {
        intents.queue.retain(|i| i.source != IntentSource::Path);
    }
}

/// Start walking `entity` to `destination`, running `then` once it arrives.
///
/// Returns `Ok(false)` when no path exists; the entity is told so through
/// its broadcaster and its current walk, if any, carries on.
pub fn start_walk(
    ctx: &mut SimContext<'_>,
    entity: EntityId,
    destination: TilePos,
    then: Vec<Action>,
) -> SimResult<bool> {
    let now = ctx.now();
    let max_nodes = ctx.config.movement.max_path_nodes;

    let path = {
        let e = ctx.world.entity(entity)?;
        let missing = |kind| SimError::MissingComponent { entity, kind };
        let transform = e
            .components
            .transform
            .as_ref()
            .ok_or_else(|| missing(ComponentKind::Transform))?;
        let state = e
            .components
            .movement_state
            .as_ref()
            .ok_or_else(|| missing(ComponentKind::MovementState))?;
        if !e.components.has(ComponentKind::PathWalk) {
            return Err(missing(ComponentKind::PathWalk));
        }
        let terrain = ctx.world.terrain(e.scene.as_deref());
        let path = find_path(
            terrain,
            state.handler.as_ref(),
            transform.position,
            destination,
            max_nodes,
        );
        if path.is_none() {
            if let Some(net) = e.components.networking.as_ref() {
                net.broadcaster
                    .emit(entity, "message", json!({ "text": UNREACHABLE_MESSAGE }));
            }
        }
        path
    };

    let Some(steps) = path else {
        tracing::debug!(entity = %entity, %destination, "walk target unreachable");
        let name = ctx.world.entity_name(entity);
        ctx.emit(
            SimEventKind::Unreachable {
                entity,
                destination,
            },
            format!("{name} cannot reach {destination}"),
        );
        return Ok(false);
    };

    drop_path_intents(ctx.world, entity);
    let step_count = steps.len();
    let walk = ctx
        .world
        .entity_mut(entity)?
        .components
        .path_walk
        .as_mut()
        .ok_or(SimError::MissingComponent {
            entity,
            kind: ComponentKind::PathWalk,
        })?;
    walk.walk_id += 1;
    walk.steps = steps.into();
    walk.destination = Some(destination);
    walk.queued_after = then.into();
    let walk_id = walk.walk_id;

    ctx.schedule(now, ScheduledEffect::WalkStep { entity, walk_id });
    ctx.emit(
        SimEventKind::WalkStarted {
            entity,
            destination,
            steps: step_count,
        },
        format!("walking to {destination}"),
    );
    Ok(true)
}

/// Stop the current walk. Pending walk steps become stale and the actions
/// queued behind the walk are dropped. Returns whether a walk was running.
pub fn cancel_walk(world: &mut World, entity: EntityId) -> bool {
    let was_walking = {
        let Some(walk) = world
            .get_entity_mut(entity)
            .and_then(|e| e.components.path_walk.as_mut())
        else {
            return false;
        };
        let was_walking = walk.is_walking();
        walk.walk_id += 1;
        walk.steps.clear();
        walk.destination = None;
        walk.queued_after.clear();
        was_walking
    };
    drop_path_intents(world, entity);
    was_walking
}

enum WalkProgress {
    Stale,
    Wait(u64),
    Step(Direction),
    Arrived(VecDeque<Action>),
}

/// Fire a scheduled walk step. On arrival the first action queued behind
/// the walk runs through `dispatcher` before the stop broadcast.
pub(crate) fn on_walk_step(
    ctx: &mut SimContext<'_>,
    entity: EntityId,
    walk_id: u64,
    dispatcher: Option<&ActionDispatcher>,
) {
    let now = ctx.now();
    let base_step_ms = ctx.config.movement.base_step_ms;

    let progress = {
        let Some(e) = ctx.world.get_entity_mut(entity) else {
            return;
        };
        let c = &mut e.components;
        match c.path_walk.as_mut() {
            Some(walk) if walk.walk_id == walk_id => {
                let busy_until = c
                    .transform
                    .as_ref()
                    .filter(|t| !t.step.is_finished(now))
                    .map(|t| t.step.ends_at());
                match busy_until {
                    Some(at) => WalkProgress::Wait(at),
                    None => match walk.steps.pop_front() {
                        Some(direction) => WalkProgress::Step(direction),
                        None => {
                            walk.destination = None;
                            WalkProgress::Arrived(std::mem::take(&mut walk.queued_after))
                        }
                    },
                }
            }
            _ => WalkProgress::Stale,
        }
    };

    match progress {
        WalkProgress::Stale => {
            tracing::trace!(entity = %entity, walk_id, "stale walk step dropped");
        }
        WalkProgress::Wait(at) => {
            ctx.schedule(at, ScheduledEffect::WalkStep { entity, walk_id });
        }
        WalkProgress::Step(direction) => {
            if let Some(intents) = ctx
                .world
                .get_entity_mut(entity)
                .and_then(|e| e.components.movement_intent.as_mut())
            {
                intents.push(MoveIntent::new(direction).from_source(IntentSource::Path));
            }
            let next = now + step_duration(direction, base_step_ms).max(1);
            ctx.schedule(next, ScheduledEffect::WalkStep { entity, walk_id });
        }
        WalkProgress::Arrived(queued) => finish_walk(ctx, entity, queued, dispatcher),
    }
}

fn finish_walk(
    ctx: &mut SimContext<'_>,
    entity: EntityId,
    queued: VecDeque<Action>,
    dispatcher: Option<&ActionDispatcher>,
) {
    let has_follow_up = !queued.is_empty();
    if let Some(queue) = ctx
        .world
        .get_entity_mut(entity)
        .and_then(|e| e.components.action_queue.as_mut())
    {
        for action in queued.into_iter().rev() {
            queue.queue.push_front(action);
        }
    }
    if let Some(dispatcher) = dispatcher.filter(|_| has_follow_up) {
        dispatcher.run_head(entity, ctx);
    }
    finish_broadcast(ctx, entity);
}

fn finish_broadcast(ctx: &mut SimContext<'_>, entity: EntityId) {
    let now = ctx.now();
    let Some(e) = ctx.world.get_entity(entity) else {
        return;
    };
    if let (Some(net), Some(actor), Some(transform)) = (
        e.components.networking.as_ref(),
        e.actor(),
        e.components.transform.as_ref(),
    ) {
        net.broadcaster.broadcast(
            &actor.channel("idle"),
            json!({
                "id": entity,
                "x": transform.position.x,
                "y": transform.position.y,
                "facing": transform.facing,
            }),
            None,
            &BroadcastOptions::stamped(now),
        );
    }
    ctx.emit(SimEventKind::WalkFinished { entity }, "walk finished");
}
