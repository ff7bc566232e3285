//! Movement capability injected into entities at construction time.
//!
//! The movement system is generic: it only knows that an entity holding a
//! `movement-state` component carries a [`MovementHandler`]. What "can I
//! enter this tile" means for a player, a patrolling NPC or a leashed
//! monster is the handler's business.

use std::f64::consts::SQRT_2;
use std::fmt;

use crate::component::{MovementStep, TransformComponent};
use crate::grid::{Direction, TilePos};
use crate::terrain::Terrain;

/// Default time to cross one tile orthogonally.
pub const DEFAULT_STEP_MS: u64 = 150;

/// How long a step in `direction` takes. Diagonals cover `sqrt(2)` tiles of
/// ground so they take proportionally longer, keeping speed constant.
pub fn step_duration(direction: Direction, base_ms: u64) -> u64 {
    if direction.is_diagonal() {
        (base_ms as f64 * SQRT_2).round() as u64
    } else {
        base_ms
    }
}

/// Everything a handler needs to resolve one step.
#[derive(Debug)]
pub struct StepRequest<'a> {
    /// Transform to move.
    pub transform: &'a mut TransformComponent,
    /// Requested direction.
    pub direction: Direction,
    /// Walkability of the current scene.
    pub terrain: &'a Terrain,
    /// Base duration of an orthogonal step.
    pub base_step_ms: u64,
    /// Current clock time in milliseconds.
    pub now: u64,
}

/// Entity-scoped movement logic.
pub trait MovementHandler: Send + Sync + fmt::Debug {
    /// Whether a step from `from` into `to` is allowed.
    fn can_enter(&self, from: TilePos, to: TilePos, terrain: &Terrain) -> bool {
        let _ = from;
        terrain.is_walkable(to)
    }

    /// Attempt one step. Facing is written first so a blocked attempt still
    /// turns the actor. Returns `true` when the position changed.
    fn step(&self, req: StepRequest<'_>) -> bool {
        let StepRequest {
            transform,
            direction,
            terrain,
            base_step_ms,
            now,
        } = req;

        transform.facing = direction.facing();
        let from = transform.position;
        let to = from.step(direction);
        if !self.can_enter(from, to, terrain) {
            transform.step.blocked = true;
            return false;
        }

        transform.position = to;
        transform.step = MovementStep {
            sequence: transform.step.sequence + 1,
            started_at: now,
            duration_ms: step_duration(direction, base_step_ms),
            direction: Some(direction),
            blocked: false,
        };
        true
    }

    /// Step in a direction picked by `roll` among the enterable ones.
    /// Returns `false` when boxed in.
    fn random_step(&self, req: StepRequest<'_>, roll: u32) -> bool {
        let from = req.transform.position;
        let options: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|d| self.can_enter(from, from.step(*d), req.terrain))
            .collect();
        if options.is_empty() {
            return false;
        }
        let direction = options[roll as usize % options.len()];
        self.step(StepRequest { direction, ..req })
    }
}

/// Keeps an actor within `radius` tiles (Manhattan) of `anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leash {
    /// Centre of the allowed area.
    pub anchor: TilePos,
    /// Maximum Manhattan distance from the anchor.
    pub radius: u32,
}

/// Stock handler: terrain walkability plus an optional leash for monster
/// spawn ranges and NPC patrol areas.
#[derive(Debug, Clone, Default)]
pub struct GridMover {
    /// Optional roaming limit.
    pub leash: Option<Leash>,
}

impl GridMover {
    /// An unleashed mover.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mover kept within `radius` of `anchor`.
    pub fn leashed(anchor: TilePos, radius: u32) -> Self {
        Self {
            leash: Some(Leash { anchor, radius }),
        }
    }
}

impl MovementHandler for GridMover {
    fn can_enter(&self, _from: TilePos, to: TilePos, terrain: &Terrain) -> bool {
        if let Some(leash) = self.leash {
            if leash.anchor.manhattan(to) > leash.radius {
                return false;
            }
        }
        terrain.is_walkable(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Facing;

    fn request<'a>(
        transform: &'a mut TransformComponent,
        direction: Direction,
        terrain: &'a Terrain,
    ) -> StepRequest<'a> {
        StepRequest {
            transform,
            direction,
            terrain,
            base_step_ms: DEFAULT_STEP_MS,
            now: 1_000,
        }
    }

    #[test]
    fn diagonal_steps_take_longer() {
        assert_eq!(step_duration(Direction::East, 150), 150);
        assert_eq!(step_duration(Direction::NorthEast, 150), 212);
    }

    #[test]
    fn successful_step_moves_and_sequences() {
        let terrain = Terrain::open();
        let mut transform = TransformComponent::at(TilePos::new(0, 0));
        let mover = GridMover::new();
        assert!(mover.step(request(&mut transform, Direction::East, &terrain)));
        assert_eq!(transform.position, TilePos::new(1, 0));
        assert_eq!(transform.facing, Facing::East);
        assert_eq!(transform.step.sequence, 1);
        assert_eq!(transform.step.started_at, 1_000);
        assert_eq!(transform.step.direction, Some(Direction::East));
    }

    #[test]
    fn blocked_step_still_turns() {
        let mut terrain = Terrain::open();
        terrain.block(TilePos::new(0, -1));
        let mut transform = TransformComponent::at(TilePos::new(0, 0));
        let mover = GridMover::new();
        assert!(!mover.step(request(&mut transform, Direction::North, &terrain)));
        assert_eq!(transform.position, TilePos::new(0, 0));
        assert_eq!(transform.facing, Facing::North);
        assert!(transform.step.blocked);
        assert_eq!(transform.step.sequence, 0);
    }

    #[test]
    fn leash_rejects_steps_out_of_range() {
        let terrain = Terrain::open();
        let mover = GridMover::leashed(TilePos::new(0, 0), 1);
        let mut transform = TransformComponent::at(TilePos::new(1, 0));
        assert!(!mover.step(request(&mut transform, Direction::East, &terrain)));
        assert!(mover.step(request(&mut transform, Direction::West, &terrain)));
    }

    #[test]
    fn random_step_fails_when_boxed_in() {
        let mut terrain = Terrain::open();
        for d in Direction::ALL {
            terrain.block(TilePos::new(0, 0).step(d));
        }
        let mut transform = TransformComponent::at(TilePos::new(0, 0));
        assert!(
            !GridMover::new().random_step(request(&mut transform, Direction::North, &terrain), 7)
        );
    }
}
