use std::collections::HashSet;

use crate::grid::TilePos;

/// Inclusive rectangular bounds of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Top-left corner.
    pub min: TilePos,
    /// Bottom-right corner.
    pub max: TilePos,
}

impl Bounds {
    /// Bounds spanning `min` to `max`.
    pub fn new(min: TilePos, max: TilePos) -> Self {
        Self { min, max }
    }

    /// Whether `pos` lies inside, edges included.
    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

/// Walkability data for a scene. Map authoring happens elsewhere; the
/// simulation only asks whether a tile can be entered.
#[derive(Debug, Clone, Default)]
pub struct Terrain {
    blocked: HashSet<TilePos>,
    bounds: Option<Bounds>,
}

impl Terrain {
    /// Unbounded terrain with nothing blocked.
    pub fn open() -> Self {
        Self::default()
    }

    /// Restrict walkable tiles to `bounds`.
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Mark a tile unwalkable.
    pub fn block(&mut self, pos: TilePos) {
        self.blocked.insert(pos);
    }

    /// Make a blocked tile walkable again.
    pub fn unblock(&mut self, pos: TilePos) {
        self.blocked.remove(&pos);
    }

    /// Scene bounds, when set.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Inside the bounds and not blocked.
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.contains(pos) {
                return false;
            }
        }
        !self.blocked.contains(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_tiles_are_not_walkable() {
        let mut terrain = Terrain::open();
        terrain.block(TilePos::new(1, 0));
        assert!(!terrain.is_walkable(TilePos::new(1, 0)));
        assert!(terrain.is_walkable(TilePos::new(2, 0)));
        terrain.unblock(TilePos::new(1, 0));
        assert!(terrain.is_walkable(TilePos::new(1, 0)));
    }

    #[test]
    fn bounds_limit_walkability() {
        let terrain =
            Terrain::open().with_bounds(Bounds::new(TilePos::new(0, 0), TilePos::new(4, 4)));
        assert!(terrain.is_walkable(TilePos::new(4, 4)));
        assert!(!terrain.is_walkable(TilePos::new(5, 0)));
        assert!(!terrain.is_walkable(TilePos::new(0, -1)));
    }
}
