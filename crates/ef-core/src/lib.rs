//! Core types for Emberfall: entities, components, and the world model.
//!
//! This crate holds the data the simulation operates on and the seams it
//! calls out through (movement handlers, broadcasters, save hooks). It has
//! no notion of time passing; see `ef-simulation` for the tick loop.

/// Movement capability injected per entity.
pub mod capability;
/// Typed component data and the tag-based component set.
pub mod component;
/// Entity types, identifiers, and actor kinds.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Tile coordinates, directions, and facing.
pub mod grid;
/// Outbound broadcast boundary.
pub mod net;
/// Query builder for filtering entities.
pub mod query;
/// Save hooks and entity snapshots.
pub mod save;
/// Attributes, resource pools, and life state.
pub mod stats;
/// Per-scene walkability.
pub mod terrain;
/// The central world model that owns entities.
pub mod world;

/// Re-export component types.
pub use component::{Component, ComponentKind, ComponentSet};
/// Re-export core entity types.
pub use entity::{ActorKind, Entity, EntityId};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export grid types.
pub use grid::{Direction, Facing, TilePos};
/// Re-export world model types.
pub use world::World;
