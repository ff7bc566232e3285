use std::sync::Arc;

use ef_core::component::{Action, ComponentKind};
use ef_core::entity::{Entity, EntityId};
use ef_core::grid::TilePos;
use ef_core::net::Broadcaster;
use ef_core::save::SaveHook;
use ef_core::world::World;
use ef_mechanics::content::{ContentLookup, ContentTable};
use ef_mechanics::stats::{RespawnOptions, RespawnOutcome, try_respawn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::action_queue::ActionQueueSystem;
use crate::clock::SimClock;
use crate::combat::{self, CombatSystem};
use crate::command::{CommandBuffer, WorldCommand};
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::movement::MovementSystem;
use crate::pathing;
use crate::persistence::PersistenceSystem;
use crate::spawn::{self, MonsterSpec, PlayerSpec};
use crate::system::System;
use crate::timer::{ScheduledEffect, TimerQueue};

/// The top-level simulation orchestrator.
///
/// Owns the world, clock, RNG, event log, timer queue, deferred commands,
/// and registered systems. One [`update`](Simulation::update) is one tick:
/// advance the clock, fire due effects, run systems in registration order,
/// then apply queued spawns and despawns.
pub struct Simulation {
    world: World,
    clock: SimClock,
    rng: StdRng,
    events: EventLog,
    timers: TimerQueue,
    commands: CommandBuffer,
    systems: Vec<Box<dyn System>>,
    config: SimConfig,
    content: Arc<dyn ContentLookup>,
    initialized: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("now", &self.clock.now())
            .field("entities", &self.world.entity_count())
            .field("systems", &self.systems.len())
            .field("timers", &self.timers.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a new simulation from a world and configuration. No systems
    /// are registered; see [`Simulation::with_default_systems`].
    pub fn new(world: World, config: SimConfig) -> Self {
        let clock = SimClock::new(config.start_ms, config.tick_ms);
        let rng = StdRng::seed_from_u64(config.seed);
        let events = EventLog::new(config.max_events);
        Self {
            world,
            clock,
            rng,
            events,
            timers: TimerQueue::new(),
            commands: CommandBuffer::new(),
            systems: Vec::new(),
            config,
            content: Arc::new(ContentTable::new()),
            initialized: false,
        }
    }

    /// Replace the content tables monsters and skills are looked up in.
    pub fn with_content(mut self, content: Arc<dyn ContentLookup>) -> Self {
        self.content = content;
        self
    }

    /// Register the standard pipeline: actions, combat, movement, persistence.
    pub fn with_default_systems(mut self) -> Self {
        self.add_system(ActionQueueSystem::default());
        self.add_system(CombatSystem::new());
        self.add_system(MovementSystem::new());
        self.add_system(PersistenceSystem::new());
        self
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    fn context(&mut self) -> SimContext<'_> {
        SimContext {
            world: &mut self.world,
            clock: &self.clock,
            events: &mut self.events,
            rng: &mut self.rng,
            timers: &mut self.timers,
            commands: &mut self.commands,
            config: &self.config,
            content: self.content.as_ref(),
        }
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let result = system.init(&mut self.context());
            self.systems[i] = system;
            result?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Advance the simulation by `delta_ms` and run one tick.
    pub fn update(&mut self, delta_ms: u64) -> SimResult<()> {
        if !self.initialized {
            self.init()?;
        }

        self.clock.advance_by(delta_ms);
        self.fire_due_effects(self.clock.now());

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            if let Err(err) = system.tick(&mut self.context()) {
                tracing::warn!(system = system.name(), error = %err, "system tick failed");
            }
            self.systems[i] = system;
        }

        self.apply_commands();
        Ok(())
    }

    /// Advance the simulation by one configured tick.
    pub fn tick(&mut self) -> SimResult<()> {
        self.update(self.clock.tick_ms())
    }

    /// Advance the simulation by `n` ticks.
    pub fn run(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    fn fire_due_effects(&mut self, now: u64) {
        let dispatcher = self
            .get_system::<ActionQueueSystem>()
            .map(|system| system.dispatcher().clone());
        while let Some((due_at, effect)) = self.timers.pop_due(now) {
            tracing::trace!(due_at, now, ?effect, "effect fired");
            let mut ctx = self.context();
            match effect {
                ScheduledEffect::WalkStep { entity, walk_id } => {
                    pathing::on_walk_step(&mut ctx, entity, walk_id, dispatcher.as_ref());
                }
                ScheduledEffect::AnimationAdvance { entity, timer } => {
                    combat::on_animation_advance(&mut ctx, entity, timer);
                }
                ScheduledEffect::ResolveAttack { entity, resolve_at } => {
                    combat::on_resolve_attack(&mut ctx, entity, resolve_at);
                }
            }
        }
    }

    /// Apply spawns and despawns queued during the tick.
    fn apply_commands(&mut self) {
        let tick = self.clock.tick();
        let now = self.clock.now();
        for command in self.commands.drain() {
            match command {
                WorldCommand::Spawn(entity) => {
                    let name = entity.name.clone();
                    match self.world.add_entity(*entity) {
                        Ok(id) => {
                            tracing::debug!(entity = %id, %name, "spawned");
                            self.events.push(SimEvent::new(
                                tick,
                                now,
                                SimEventKind::Spawned { entity: id },
                                format!("{name} spawned"),
                            ));
                        }
                        Err(err) => tracing::warn!(%name, error = %err, "spawn failed"),
                    }
                }
                WorldCommand::Despawn(id) => match self.world.remove_entity(id) {
                    Ok(entity) => {
                        self.timers.forget(id);
                        tracing::debug!(entity = %id, name = %entity.name, "despawned");
                        self.events.push(SimEvent::new(
                            tick,
                            now,
                            SimEventKind::Despawned { entity: id },
                            format!("{} despawned", entity.name),
                        ));
                    }
                    Err(err) => tracing::warn!(entity = %id, error = %err, "despawn failed"),
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commands from outside the tick
    // -----------------------------------------------------------------------

    /// Walk `entity` to `destination`. Returns `false` when no path exists.
    pub fn walk_to(&mut self, entity: EntityId, destination: TilePos) -> SimResult<bool> {
        self.walk_to_then(entity, destination, Vec::new())
    }

    /// Walk `entity` to `destination`, then run `then` in order.
    pub fn walk_to_then(
        &mut self,
        entity: EntityId,
        destination: TilePos,
        then: Vec<Action>,
    ) -> SimResult<bool> {
        pathing::start_walk(&mut self.context(), entity, destination, then)
    }

    /// Stop `entity`'s walk. Returns whether it was walking.
    pub fn cancel_walk(&mut self, entity: EntityId) -> bool {
        pathing::cancel_walk(&mut self.world, entity)
    }

    /// Queue an action. While the entity is walking, the action waits
    /// behind the walk.
    pub fn enqueue_action(&mut self, entity: EntityId, action: Action) -> SimResult<()> {
        let e = self.world.entity_mut(entity)?;
        if let Some(walk) = e.components.path_walk.as_mut().filter(|w| w.is_walking()) {
            walk.queued_after.push_back(action);
            return Ok(());
        }
        let queue = e
            .components
            .action_queue
            .as_mut()
            .ok_or(SimError::MissingComponent {
                entity,
                kind: ComponentKind::ActionQueue,
            })?;
        queue.enqueue(action);
        Ok(())
    }

    /// Queue an entity to enter the world at the end of the next tick.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.commands.spawn(entity)
    }

    /// Queue a player built from `spec`.
    pub fn spawn_player(
        &mut self,
        spec: PlayerSpec,
        broadcaster: Arc<dyn Broadcaster>,
        hook: Arc<dyn SaveHook>,
    ) -> EntityId {
        let entity = spawn::player(
            spec,
            broadcaster,
            hook,
            self.config.persistence.player_save_cooldown_ms,
            &self.config.lifecycle,
        );
        self.commands.spawn(entity)
    }

    /// Queue a monster of a known archetype.
    pub fn spawn_monster(
        &mut self,
        spec: MonsterSpec,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> SimResult<EntityId> {
        let archetype = self.content.require_monster(&spec.archetype)?;
        let entity = spawn::monster(spec, archetype, broadcaster, &self.config.lifecycle);
        Ok(self.commands.spawn(entity))
    }

    /// Queue an entity to leave the world at the end of the next tick.
    pub fn despawn(&mut self, entity: EntityId) {
        self.commands.despawn(entity);
    }

    /// Bring a dead entity back. Living or permadead entities need `force`.
    pub fn respawn(&mut self, entity: EntityId, force: bool) -> SimResult<RespawnOutcome> {
        let now = self.clock.now();
        let tuning = self.config.lifecycle;
        let e = self.world.entity_mut(entity)?;
        let stats = e
            .components
            .stats
            .as_mut()
            .ok_or(SimError::MissingComponent {
                entity,
                kind: ComponentKind::Stats,
            })?;
        let outcome = try_respawn(stats, RespawnOptions { force }, &tuning);
        if outcome.success {
            e.mark_dirty(now);
            tracing::info!(entity = %entity, health = outcome.health, "respawned");
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Events logged so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Pending deferred effects.
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> World {
        self.world
    }

    /// Ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Current clock time in milliseconds.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
