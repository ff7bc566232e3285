use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer tile coordinate on a scene grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    /// Column, growing east.
    pub x: i32,
    /// Row, growing south.
    pub y: i32,
}

impl TilePos {
    /// Create a tile position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another tile.
    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The tile one step away in `direction`.
    pub fn step(self, direction: Direction) -> TilePos {
        let (dx, dy) = direction.delta();
        TilePos::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the eight compass directions a step can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards negative y.
    North,
    /// Up and right.
    NorthEast,
    /// Towards positive x.
    East,
    /// Down and right.
    SouthEast,
    /// Towards positive y.
    South,
    /// Down and left.
    SouthWest,
    /// Towards negative x.
    West,
    /// Up and left.
    NorthWest,
}

impl Direction {
    /// All eight directions, clockwise from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The four cardinal directions, clockwise from north.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Tile delta `(dx, dy)` for one step. North is `-y`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Whether both axes change.
    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.delta();
        dx != 0 && dy != 0
    }

    /// Direction for a unit delta, if it is one.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        Self::ALL
            .into_iter()
            .find(|d| d.delta() == (dx.signum(), dy.signum()) && (dx, dy) != (0, 0))
    }

    /// Best single step from `from` toward `to`. `None` when already there.
    pub fn toward(from: TilePos, to: TilePos) -> Option<Direction> {
        Self::from_delta(to.x - from.x, to.y - from.y)
    }

    /// The cardinal facing an actor shows after stepping this way.
    ///
    /// Diagonals resolve to their horizontal component, matching how
    /// four-way sprites are picked client side.
    pub fn facing(self) -> Facing {
        match self {
            Self::North => Facing::North,
            Self::South => Facing::South,
            Self::East | Self::NorthEast | Self::SouthEast => Facing::East,
            Self::West | Self::NorthWest | Self::SouthWest => Facing::West,
        }
    }

    /// Stable lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::NorthEast => "north_east",
            Self::East => "east",
            Self::SouthEast => "south_east",
            Self::South => "south",
            Self::SouthWest => "south_west",
            Self::West => "west",
            Self::NorthWest => "north_west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-way facing shown by an actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Facing up.
    North,
    /// Facing right.
    East,
    /// Facing down, the spawn default.
    #[default]
    South,
    /// Facing left.
    West,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "north"),
            Self::East => write!(f, "east"),
            Self::South => write!(f, "south"),
            Self::West => write!(f, "west"),
        }
    }
}
