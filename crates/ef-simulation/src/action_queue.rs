//! Per-entity action queues and the dispatcher that runs them.
//!
//! Each tick, every entity with an `action-queue` gets at most one action
//! looked at: the head of its queue. The handler registered for the
//! action's kind decides whether it is done, failed, or should wait.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ef_core::capability::StepRequest;
use ef_core::component::{Action, ActionKind, AiAction, ComponentKind};
use ef_core::entity::EntityId;
use ef_core::grid::{Direction, TilePos};
use ef_core::net::BroadcastOptions;
use ef_mechanics::combat::record_skill_input;
use rand::Rng;
use serde_json::json;

use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::system::System;
use crate::timer::ScheduledEffect;

/// What a handler did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Finished. The action is removed.
    Done,
    /// Could not be carried out. The action is removed and not retried.
    Failed,
    /// Not yet possible. The action stays at the head for the next tick.
    Defer,
}

/// Runs one kind of action.
pub trait ActionHandler: Send + Sync + fmt::Debug {
    /// Run `action` for `entity`.
    fn handle(
        &self,
        entity: EntityId,
        action: &Action,
        ctx: &mut SimContext<'_>,
    ) -> SimResult<ActionOutcome>;
}

// ---------------------------------------------------------------------------
// AI behaviours
// ---------------------------------------------------------------------------

/// One `ai` action handed to its behaviour.
pub struct AiCall<'c, 'a> {
    /// The acting entity.
    pub entity: EntityId,
    /// The queued action.
    pub action: &'c AiAction,
    /// Tick context.
    pub ctx: &'c mut SimContext<'a>,
}

/// A named AI routine.
pub trait AiBehaviour: Send + Sync + fmt::Debug {
    /// Run one queued call.
    fn execute(&self, call: AiCall<'_, '_>) -> SimResult<ActionOutcome>;
}

/// Name of the stock wandering behaviour.
pub const RANDOM_WALK: &str = "random-walk";

/// Takes one step in a random enterable direction through the entity's
/// own movement handler.
#[derive(Debug, Default)]
pub struct RandomWalk;

impl AiBehaviour for RandomWalk {
    fn execute(&self, call: AiCall<'_, '_>) -> SimResult<ActionOutcome> {
        let AiCall { entity: id, ctx, .. } = call;
        let now = ctx.now();
        let base_step_ms = ctx.config.movement.base_step_ms;
        let roll: u32 = ctx.rng.random();

        let (entity, terrain) = ctx
            .world
            .entity_and_terrain_mut(id)
            .ok_or(SimError::EntityNotFound(id))?;
        let c = &mut entity.components;
        let transform = c.transform.as_mut().ok_or(SimError::MissingComponent {
            entity: id,
            kind: ComponentKind::Transform,
        })?;
        let state = c.movement_state.as_ref().ok_or(SimError::MissingComponent {
            entity: id,
            kind: ComponentKind::MovementState,
        })?;

        if !transform.step.is_finished(now) {
            return Ok(ActionOutcome::Defer);
        }

        let request = StepRequest {
            transform,
            direction: Direction::North,
            terrain,
            base_step_ms,
            now,
        };
        if !state.handler.random_step(request, roll) {
            tracing::debug!(entity = %id, "random walk boxed in");
            return Ok(ActionOutcome::Failed);
        }

        let to = transform_position(ctx, id);
        if let Some(entity) = ctx.world.get_entity_mut(id) {
            entity.mark_dirty(now);
        }
        if let Some(to) = to {
            ctx.emit(SimEventKind::Moved { entity: id, to }, "wandered");
        }
        Ok(ActionOutcome::Done)
    }
}

fn transform_position(ctx: &SimContext<'_>, id: EntityId) -> Option<TilePos> {
    ctx.world
        .get_entity(id)
        .and_then(|e| e.components.transform.as_ref())
        .map(|t| t.position)
}

/// AI behaviours by name.
#[derive(Debug, Clone, Default)]
pub struct BehaviourRegistry {
    behaviours: HashMap<String, Arc<dyn AiBehaviour>>,
}

impl BehaviourRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the stock behaviours.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RANDOM_WALK, Arc::new(RandomWalk));
        registry
    }

    /// Register `behaviour` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, behaviour: Arc<dyn AiBehaviour>) {
        self.behaviours.insert(name.into(), behaviour);
    }

    /// Look up a behaviour by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AiBehaviour>> {
        self.behaviours.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Default handlers
// ---------------------------------------------------------------------------

/// `move`: queue the intent for the movement system.
#[derive(Debug, Default)]
pub struct MoveHandler;

impl ActionHandler for MoveHandler {
    fn handle(
        &self,
        entity: EntityId,
        action: &Action,
        ctx: &mut SimContext<'_>,
    ) -> SimResult<ActionOutcome> {
        let Action::Move(intent) = action else {
            return Ok(ActionOutcome::Failed);
        };
        let intents = ctx
            .world
            .entity_mut(entity)?
            .components
            .movement_intent
            .as_mut()
            .ok_or(SimError::MissingComponent {
                entity,
                kind: ComponentKind::MovementIntent,
            })?;
        intents.push(*intent);
        Ok(ActionOutcome::Done)
    }
}

/// `ai`: look the behaviour up by name and run it.
#[derive(Debug, Clone, Default)]
pub struct AiHandler {
    behaviours: BehaviourRegistry,
}

impl AiHandler {
    /// Dispatch `ai` actions to `behaviours`.
    pub fn new(behaviours: BehaviourRegistry) -> Self {
        Self { behaviours }
    }
}

impl ActionHandler for AiHandler {
    fn handle(
        &self,
        entity: EntityId,
        action: &Action,
        ctx: &mut SimContext<'_>,
    ) -> SimResult<ActionOutcome> {
        let Action::Ai(ai) = action else {
            return Ok(ActionOutcome::Failed);
        };
        let behaviour = self
            .behaviours
            .get(&ai.behaviour)
            .ok_or_else(|| SimError::UnknownBehaviour(ai.behaviour.clone()))?;
        behaviour.execute(AiCall {
            entity,
            action: ai,
            ctx,
        })
    }
}

/// `use-skill`: validate against content and feed the player combat
/// controller.
#[derive(Debug, Default)]
pub struct SkillHandler;

impl ActionHandler for SkillHandler {
    fn handle(
        &self,
        id: EntityId,
        action: &Action,
        ctx: &mut SimContext<'_>,
    ) -> SimResult<ActionOutcome> {
        let Action::UseSkill(skill_use) = action else {
            return Ok(ActionOutcome::Failed);
        };
        let now = ctx.now();
        let content = ctx.content;

        let definition = match content.require_skill(&skill_use.skill_id) {
            Ok(definition) => definition,
            Err(err) => {
                tracing::debug!(entity = %id, error = %err, "skill input rejected");
                ctx.emit(
                    SimEventKind::SkillRejected {
                        entity: id,
                        skill: skill_use.skill_id.clone(),
                    },
                    format!("unknown skill {}", skill_use.skill_id),
                );
                return Ok(ActionOutcome::Failed);
            }
        };
        if definition.requires_target && skill_use.target.is_none() {
            tracing::debug!(entity = %id, skill = %definition.id, "skill needs a target");
            return Ok(ActionOutcome::Failed);
        }

        let mut tuning = ctx.config.combat;
        if let Some(ms) = definition.animation_ms {
            tuning.attack_animation_ms = ms;
        }

        let entity = ctx.world.entity_mut(id)?;
        let actor = entity.actor();
        let c = &mut entity.components;
        let combat = c.player_combat.as_mut().ok_or(SimError::MissingComponent {
            entity: id,
            kind: ComponentKind::PlayerCombat,
        })?;
        let accepted = record_skill_input(
            combat,
            c.animation.as_mut(),
            &definition.id,
            skill_use.data.clone(),
            now,
            &tuning,
        );

        let Some(accepted) = accepted else {
            ctx.emit(
                SimEventKind::SkillRejected {
                    entity: id,
                    skill: definition.id.clone(),
                },
                "skill input inside global cooldown",
            );
            return Ok(ActionOutcome::Failed);
        };

        if let (Some(net), Some(actor)) = (c.networking.as_ref(), actor) {
            net.broadcaster.broadcast(
                &actor.channel("skill"),
                json!({
                    "id": id,
                    "skill": definition.id,
                    "sequence": accepted.sequence,
                    "target": skill_use.target,
                }),
                None,
                &BroadcastOptions::stamped(now),
            );
        }

        if let Some(timer) = accepted.animation {
            ctx.schedule(
                timer.due_at,
                ScheduledEffect::AnimationAdvance { entity: id, timer },
            );
        }
        ctx.emit(
            SimEventKind::SkillAccepted {
                entity: id,
                skill: definition.id.clone(),
                sequence: accepted.sequence,
            },
            format!("used {}", definition.name),
        );
        Ok(ActionOutcome::Done)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher & system
// ---------------------------------------------------------------------------

/// Handlers keyed by action kind. Any entry can be replaced.
#[derive(Debug, Clone, Default)]
pub struct ActionDispatcher {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    /// A dispatcher with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock handlers, with `ai` actions resolved against `behaviours`.
    pub fn with_defaults(behaviours: BehaviourRegistry) -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(ActionKind::Move, Arc::new(MoveHandler));
        dispatcher.register(ActionKind::Ai, Arc::new(AiHandler::new(behaviours)));
        dispatcher.register(ActionKind::UseSkill, Arc::new(SkillHandler));
        dispatcher
    }

    /// Install the handler for one action kind.
    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// The handler for `kind`, if any.
    pub fn handler(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    fn dispatch(
        &self,
        entity: EntityId,
        action: &Action,
        ctx: &mut SimContext<'_>,
    ) -> SimResult<ActionOutcome> {
        let handler = self
            .handler(action.kind())
            .ok_or(SimError::NoHandler(action.kind()))?;
        handler.handle(entity, action, ctx)
    }

    /// Run the head of `id`'s action queue once and settle the outcome.
    /// Returns `false` when there was nothing to run.
    pub(crate) fn run_head(&self, id: EntityId, ctx: &mut SimContext<'_>) -> bool {
        let now = ctx.now();
        let tick = ctx.tick();
        let action = {
            let Some(entity) = ctx.world.get_entity_mut(id) else {
                return false;
            };
            if !entity.is_alive() {
                return false;
            }
            let Some(queue) = entity.components.action_queue.as_mut() else {
                return false;
            };
            let Some(head) = queue.queue.front().cloned() else {
                return false;
            };
            queue.active = Some(head.clone());
            queue.last_run_tick = Some(tick);
            head
        };

        let outcome = match self.dispatch(id, &action, ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    entity = %id,
                    action = %action.kind(),
                    error = %err,
                    "action failed"
                );
                ctx.emit(
                    SimEventKind::ActionFailed {
                        entity: id,
                        reason: err.to_string(),
                    },
                    format!("{} action failed", action.kind()),
                );
                ActionOutcome::Failed
            }
        };

        let Some(queue) = ctx
            .world
            .get_entity_mut(id)
            .and_then(|e| e.components.action_queue.as_mut())
        else {
            return true;
        };
        queue.active = None;
        match outcome {
            ActionOutcome::Defer => {}
            ActionOutcome::Done | ActionOutcome::Failed => {
                if let Some(pos) = queue.queue.iter().position(|a| *a == action) {
                    queue.queue.remove(pos);
                }
                queue.last_processed_at = Some(now);
            }
        }
        true
    }
}

/// Runs the head of every action queue once per tick.
#[derive(Debug)]
pub struct ActionQueueSystem {
    dispatcher: ActionDispatcher,
}

impl Default for ActionQueueSystem {
    fn default() -> Self {
        Self::new(ActionDispatcher::with_defaults(
            BehaviourRegistry::with_builtins(),
        ))
    }
}

impl ActionQueueSystem {
    /// A system dispatching through `dispatcher`.
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self { dispatcher }
    }

    /// The handler table.
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// The handler table, for swapping handlers after construction.
    pub fn dispatcher_mut(&mut self) -> &mut ActionDispatcher {
        &mut self.dispatcher
    }

    /// Skip entities already served this tick, e.g. by an arriving walk.
    fn process(&self, id: EntityId, ctx: &mut SimContext<'_>) {
        let tick = ctx.tick();
        let served = ctx
            .world
            .get_entity(id)
            .and_then(|e| e.components.action_queue.as_ref())
            .is_some_and(|q| q.last_run_tick == Some(tick));
        if served {
            return;
        }
        self.dispatcher.run_head(id, ctx);
    }
}

impl System for ActionQueueSystem {
    fn name(&self) -> &str {
        "action-queue"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for id in ctx.world.query(ComponentKind::ActionQueue) {
            self.process(id, ctx);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::simulation::Simulation;
    use ef_core::component::{
        ActionQueueComponent, AnimationComponent, AnimationState, MoveIntent,
        MovementIntentComponent, PlayerCombatComponent,
    };
    use ef_core::entity::Entity;
    use ef_core::world::World;
    use ef_mechanics::content::{ContentTable, SkillDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
        outcome: Option<ActionOutcome>,
    }

    impl ActionHandler for Counting {
        fn handle(
            &self,
            _entity: EntityId,
            _action: &Action,
            _ctx: &mut SimContext<'_>,
        ) -> SimResult<ActionOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .ok_or_else(|| SimError::SystemError("handler exploded".into()))
        }
    }

    fn sim_with(handler: Arc<Counting>) -> (Simulation, EntityId) {
        let mut world = World::new();
        let mut queue = ActionQueueComponent::default();
        queue.enqueue(Action::ai("think"));
        queue.enqueue(Action::Move(MoveIntent::new(Direction::East)));
        let id = world
            .add_entity(
                Entity::new("Kael")
                    .with(queue)
                    .with(MovementIntentComponent::default()),
            )
            .unwrap();

        let mut dispatcher = ActionDispatcher::with_defaults(BehaviourRegistry::new());
        dispatcher.register(ActionKind::Ai, handler);
        let mut sim = Simulation::new(world, SimConfig::default());
        sim.add_system(ActionQueueSystem::new(dispatcher));
        (sim, id)
    }

    fn queue(sim: &Simulation, id: EntityId) -> &ActionQueueComponent {
        sim.world()
            .get_entity(id)
            .and_then(|e| e.components.action_queue.as_ref())
            .unwrap()
    }

    #[test]
    fn defer_keeps_head_and_timestamp() {
        let handler = Arc::new(Counting {
            outcome: Some(ActionOutcome::Defer),
            ..Default::default()
        });
        let (mut sim, id) = sim_with(Arc::clone(&handler));

        sim.run(3).unwrap();

        let q = queue(&sim, id);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(q.queue.len(), 2);
        assert!(matches!(q.queue.front(), Some(Action::Ai(_))));
        assert!(q.active.is_none());
        assert!(q.last_processed_at.is_none());
    }

    #[test]
    fn one_action_per_tick() {
        let handler = Arc::new(Counting {
            outcome: Some(ActionOutcome::Done),
            ..Default::default()
        });
        let (mut sim, id) = sim_with(Arc::clone(&handler));

        sim.tick().unwrap();
        assert_eq!(queue(&sim, id).queue.len(), 1);
        assert_eq!(queue(&sim, id).last_processed_at, Some(50));

        sim.tick().unwrap();
        assert!(queue(&sim, id).queue.is_empty());
        let intents = sim
            .world()
            .get_entity(id)
            .and_then(|e| e.components.movement_intent.as_ref())
            .unwrap();
        assert_eq!(intents.queue.len(), 1);
    }

    #[test]
    fn handler_error_counts_as_failure() {
        let handler = Arc::new(Counting::default());
        let (mut sim, id) = sim_with(Arc::clone(&handler));

        sim.tick().unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue(&sim, id).queue.len(), 1);
        let failures = sim
            .events()
            .filter(|k| matches!(k, SimEventKind::ActionFailed { .. }));
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn unknown_behaviour_is_not_retried() {
        let mut world = World::new();
        let mut queue = ActionQueueComponent::default();
        queue.enqueue(Action::ai("dance"));
        let id = world.add_entity(Entity::new("Rat").with(queue)).unwrap();
        let mut sim = Simulation::new(world, SimConfig::default());
        sim.add_system(ActionQueueSystem::default());

        sim.tick().unwrap();

        let q = sim
            .world()
            .get_entity(id)
            .and_then(|e| e.components.action_queue.as_ref())
            .unwrap();
        assert!(q.queue.is_empty());
        assert_eq!(q.last_processed_at, Some(50));
    }

    #[test]
    fn skill_inputs_respect_global_cooldown() {
        let mut content = ContentTable::new();
        content.add_skill(SkillDefinition {
            id: "slash".into(),
            name: "Slash".into(),
            animation_ms: Some(200),
            requires_target: false,
        });

        let mut world = World::new();
        let mut queue = ActionQueueComponent::default();
        queue.enqueue(Action::skill("slash", None));
        queue.enqueue(Action::skill("slash", None));
        queue.enqueue(Action::skill("fireball", None));
        let id = world
            .add_entity(
                Entity::new("Kael")
                    .with(queue)
                    .with(PlayerCombatComponent::default())
                    .with(AnimationComponent::default()),
            )
            .unwrap();

        let mut sim =
            Simulation::new(world, SimConfig::default()).with_content(Arc::new(content));
        sim.add_system(ActionQueueSystem::default());
        sim.run(3).unwrap();

        let entity = sim.world().get_entity(id).unwrap();
        let combat = entity.components.player_combat.as_ref().unwrap();
        // First accepted at 50; second at 100 lands inside the 350 ms cooldown.
        assert_eq!(combat.sequence, 1);
        assert_eq!(combat.global_cooldown_until, 400);
        assert_eq!(
            entity.components.animation.as_ref().unwrap().state,
            AnimationState::Attack
        );
        let rejected = sim
            .events()
            .filter(|k| matches!(k, SimEventKind::SkillRejected { .. }));
        assert_eq!(rejected.len(), 2);
    }
}
