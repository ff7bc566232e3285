//! Deferred effects keyed by due time.
//!
//! Nothing here is ever cancelled. Each effect carries the generation token
//! it was scheduled under and its handler compares that token against the
//! entity's current state when it fires; a mismatch drops the effect.

use std::collections::BTreeMap;

use ef_core::entity::EntityId;
use ef_mechanics::combat::AnimationTimer;

/// An effect waiting for its due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEffect {
    /// Feed the next step of a path walk. Valid while `walk_id` matches.
    WalkStep {
        /// The walking entity.
        entity: EntityId,
        /// Walk generation the step belongs to.
        walk_id: u64,
    },
    /// Move an animation along. Valid while the animation sequence matches.
    AnimationAdvance {
        /// The animated player.
        entity: EntityId,
        /// Phase and sequence to advance from.
        timer: AnimationTimer,
    },
    /// Resolve a wound-up monster attack. Valid while the pending attack's
    /// `resolve_at` matches.
    ResolveAttack {
        /// The attacking monster.
        entity: EntityId,
        /// Resolve time recorded when the windup began.
        resolve_at: u64,
    },
}

impl ScheduledEffect {
    /// Entity the effect belongs to.
    pub fn entity(&self) -> EntityId {
        match self {
            Self::WalkStep { entity, .. }
            | Self::AnimationAdvance { entity, .. }
            | Self::ResolveAttack { entity, .. } => *entity,
        }
    }
}

/// Min-ordered queue of effects. Effects due at the same time fire in
/// scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(u64, u64), ScheduledEffect>,
    next_seq: u64,
}

impl TimerQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `effect` to fire once the clock reaches `due_at`.
    pub fn schedule(&mut self, due_at: u64, effect: ScheduledEffect) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due_at, seq), effect);
    }

    /// Remove and return the earliest effect due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, ScheduledEffect)> {
        let (&(due_at, _), _) = self.entries.first_key_value()?;
        if due_at > now {
            return None;
        }
        self.entries
            .pop_first()
            .map(|((due_at, _), effect)| (due_at, effect))
    }

    /// Due time of the earliest effect.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due_at, _)| *due_at)
    }

    /// Drop every effect aimed at `entity`.
    pub fn forget(&mut self, entity: EntityId) {
        self.entries.retain(|_, effect| effect.entity() != entity);
    }

    /// Number of pending effects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(entity: EntityId, walk_id: u64) -> ScheduledEffect {
        ScheduledEffect::WalkStep { entity, walk_id }
    }

    #[test]
    fn pops_in_due_order() {
        let id = EntityId::new();
        let mut timers = TimerQueue::new();
        timers.schedule(300, walk(id, 3));
        timers.schedule(100, walk(id, 1));
        timers.schedule(200, walk(id, 2));

        assert_eq!(timers.next_due(), Some(100));
        assert_eq!(timers.pop_due(250), Some((100, walk(id, 1))));
        assert_eq!(timers.pop_due(250), Some((200, walk(id, 2))));
        assert_eq!(timers.pop_due(250), None);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn same_due_time_keeps_schedule_order() {
        let a = EntityId::new();
        let b = EntityId::new();
        let mut timers = TimerQueue::new();
        timers.schedule(100, walk(b, 1));
        timers.schedule(100, walk(a, 1));
        assert_eq!(timers.pop_due(100).map(|(_, e)| e.entity()), Some(b));
        assert_eq!(timers.pop_due(100).map(|(_, e)| e.entity()), Some(a));
        assert!(timers.is_empty());
    }

    #[test]
    fn forget_drops_entity_effects() {
        let a = EntityId::new();
        let b = EntityId::new();
        let mut timers = TimerQueue::new();
        timers.schedule(100, walk(a, 1));
        timers.schedule(
            120,
            ScheduledEffect::ResolveAttack {
                entity: a,
                resolve_at: 120,
            },
        );
        timers.schedule(150, walk(b, 1));
        timers.forget(a);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.pop_due(1_000).map(|(_, e)| e.entity()), Some(b));
    }
}
