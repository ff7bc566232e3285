//! World mutations deferred to the end of the tick.
//!
//! Systems iterate over entity id snapshots, so adding or removing entities
//! mid-pass would let a system see half a tick. Spawns and despawns are
//! recorded here and applied once every system has run.

use ef_core::entity::{Entity, EntityId};

/// A structural change to the world.
#[derive(Debug)]
pub enum WorldCommand {
    /// Insert the entity.
    Spawn(Box<Entity>),
    /// Remove the entity and its timers.
    Despawn(EntityId),
}

/// Commands recorded during a tick.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<WorldCommand>,
}

impl CommandBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entity to enter the world. Returns its id.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.commands.push(WorldCommand::Spawn(Box::new(entity)));
        id
    }

    /// Queue an entity to leave the world.
    pub fn despawn(&mut self, id: EntityId) {
        self.commands.push(WorldCommand::Despawn(id));
    }

    /// Take every queued command in recording order.
    pub fn drain(&mut self) -> Vec<WorldCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
