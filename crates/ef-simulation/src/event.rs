use ef_core::entity::EntityId;
use ef_core::grid::{Direction, TilePos};

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEventKind {
    // Movement
    /// An entity completed a step.
    Moved {
        /// The entity that moved.
        entity: EntityId,
        /// The tile it moved to.
        to: TilePos,
    },
    /// A step was refused by the entity's movement handler.
    Blocked {
        /// The entity that tried to move.
        entity: EntityId,
        /// The direction it tried.
        direction: Direction,
    },
    /// A multi-tile walk began.
    WalkStarted {
        /// The walking entity.
        entity: EntityId,
        /// Where the walk ends.
        destination: TilePos,
        /// Number of steps planned.
        steps: usize,
    },
    /// A walk ran out of steps.
    WalkFinished {
        /// The entity that finished walking.
        entity: EntityId,
    },
    /// A walk was requested to a tile no path reaches.
    Unreachable {
        /// The entity that asked.
        entity: EntityId,
        /// The requested destination.
        destination: TilePos,
    },

    // Combat
    /// A monster picked a new target.
    TargetAcquired {
        /// The monster.
        entity: EntityId,
        /// Its new target.
        target: EntityId,
    },
    /// A monster lost its target.
    TargetLost {
        /// The monster.
        entity: EntityId,
        /// The target it dropped.
        target: EntityId,
    },
    /// A monster wound up an attack.
    AttackCommitted {
        /// The attacker.
        entity: EntityId,
        /// The intended victim.
        target: EntityId,
        /// Damage that lands if the attack resolves.
        damage: u32,
    },
    /// A wound-up attack landed.
    AttackResolved {
        /// The attacker.
        entity: EntityId,
        /// The victim.
        target: EntityId,
        /// Health actually removed.
        applied: u32,
    },
    /// A wound-up attack failed re-validation.
    AttackFizzled {
        /// The attacker.
        entity: EntityId,
    },
    /// A player skill input was accepted.
    SkillAccepted {
        /// The player.
        entity: EntityId,
        /// The skill used.
        skill: String,
        /// Server-assigned input sequence.
        sequence: u64,
    },
    /// A player skill input was dropped.
    SkillRejected {
        /// The player.
        entity: EntityId,
        /// The skill requested.
        skill: String,
    },

    // Lifecycle
    /// An entity survived a lethal hit by spending a cheat-death charge.
    CheatDeath {
        /// The survivor.
        entity: EntityId,
    },
    /// An entity died.
    EntityDied {
        /// The entity that died.
        entity: EntityId,
        /// The cause of death.
        cause: String,
    },
    /// A save was dispatched for an entity.
    Saved {
        /// The entity saved.
        entity: EntityId,
    },
    /// An entity entered the world through the command buffer.
    Spawned {
        /// The new entity.
        entity: EntityId,
    },
    /// An entity left the world through the command buffer.
    Despawned {
        /// The removed entity.
        entity: EntityId,
    },

    // Actions
    /// An action handler reported failure.
    ActionFailed {
        /// The acting entity.
        entity: EntityId,
        /// Why it failed.
        reason: String,
    },

    // Custom
    /// A user-defined event.
    Custom {
        /// A label identifying the custom event type.
        label: String,
        /// The entities involved in this custom event.
        entities: Vec<EntityId>,
    },
}

impl SimEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Moved { entity, .. }
            | Self::Blocked { entity, .. }
            | Self::WalkStarted { entity, .. }
            | Self::WalkFinished { entity }
            | Self::Unreachable { entity, .. }
            | Self::AttackFizzled { entity }
            | Self::SkillAccepted { entity, .. }
            | Self::SkillRejected { entity, .. }
            | Self::CheatDeath { entity }
            | Self::EntityDied { entity, .. }
            | Self::Saved { entity }
            | Self::Spawned { entity }
            | Self::Despawned { entity }
            | Self::ActionFailed { entity, .. } => *entity == id,
            Self::TargetAcquired { entity, target }
            | Self::TargetLost { entity, target }
            | Self::AttackCommitted { entity, target, .. }
            | Self::AttackResolved { entity, target, .. } => *entity == id || *target == id,
            Self::Custom { entities, .. } => entities.contains(&id),
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// Simulation time in milliseconds.
    pub at: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new simulation event.
    pub fn new(tick: u64, at: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            at,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Return all events matching `pred`.
    pub fn filter<F>(&self, pred: F) -> Vec<&SimEvent>
    where
        F: Fn(&SimEventKind) -> bool,
    {
        self.events.iter().filter(|e| pred(&e.kind)).collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(entity: EntityId) -> SimEventKind {
        SimEventKind::Moved {
            entity,
            to: TilePos::new(1, 0),
        }
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        let id = EntityId::new();
        log.push(SimEvent::new(1, 50, moved(id), "test"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_entity(id).len(), 1);
        assert_eq!(log.events()[0].at, 50);
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        let id = EntityId::new();
        for i in 0..5 {
            log.push(SimEvent::new(i, i * 50, moved(id), "test"));
        }
        assert_eq!(log.len(), 2);
        // Oldest events were dropped, newest remain
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn event_kind_involves_entity() {
        let e1 = EntityId::new();
        let e2 = EntityId::new();
        let e3 = EntityId::new();

        let kind = moved(e1);
        assert!(kind.involves(e1));
        assert!(!kind.involves(e2));

        // Attacks involve both sides
        let kind = SimEventKind::AttackResolved {
            entity: e1,
            target: e2,
            applied: 4,
        };
        assert!(kind.involves(e1));
        assert!(kind.involves(e2));
        assert!(!kind.involves(e3));

        let kind = SimEventKind::Custom {
            label: "test".into(),
            entities: vec![e1, e2],
        };
        assert!(kind.involves(e1));
        assert!(kind.involves(e2));
        assert!(!kind.involves(e3));
    }

    #[test]
    fn event_log_filter_by_kind() {
        let mut log = EventLog::new(0);
        let id = EntityId::new();
        log.push(SimEvent::new(1, 50, moved(id), "moved"));
        log.push(SimEvent::new(1, 50, SimEventKind::Saved { entity: id }, "saved"));
        log.push(SimEvent::new(2, 100, moved(id), "moved"));

        let moves = log.filter(|k| matches!(k, SimEventKind::Moved { .. }));
        assert_eq!(moves.len(), 2);
        assert_eq!(log.events_at_tick(1).len(), 2);
        assert_eq!(log.events_at_tick(3).len(), 0);
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(SimEvent::new(1, 0, moved(EntityId::new()), "test"));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}
