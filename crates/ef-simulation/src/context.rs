use ef_core::entity::{Entity, EntityId};
use ef_core::world::World;
use ef_mechanics::content::ContentLookup;
use rand::rngs::StdRng;

use crate::clock::SimClock;
use crate::command::CommandBuffer;
use crate::config::SimConfig;
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::timer::{ScheduledEffect, TimerQueue};

/// Mutable context passed to each system during a tick.
pub struct SimContext<'a> {
    /// Entity store.
    pub world: &'a mut World,
    /// Simulation clock.
    pub clock: &'a SimClock,
    /// Event sink.
    pub events: &'a mut EventLog,
    /// Seeded RNG.
    pub rng: &'a mut StdRng,
    /// Deferred effects.
    pub timers: &'a mut TimerQueue,
    /// Spawns and despawns applied after the tick.
    pub commands: &'a mut CommandBuffer,
    /// Simulation settings.
    pub config: &'a SimConfig,
    /// Static game content.
    pub content: &'a dyn ContentLookup,
}

impl SimContext<'_> {
    /// Emit a simulation event at the current tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events.push(SimEvent::new(
            self.clock.tick(),
            self.clock.now(),
            kind,
            description,
        ));
    }

    /// Current tick number.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Current simulation time in milliseconds.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Schedule an effect for `due_at`.
    pub fn schedule(&mut self, due_at: u64, effect: ScheduledEffect) {
        self.timers.schedule(due_at, effect);
    }

    /// Queue an entity to enter the world at the end of the tick.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.commands.spawn(entity)
    }

    /// Queue an entity to leave the world at the end of the tick.
    pub fn despawn(&mut self, id: EntityId) {
        self.commands.despawn(id);
    }
}
