//! Persistence boundary: save hooks and the snapshot they receive.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{ActorKind, Entity, EntityId};
use crate::grid::{Facing, TilePos};
use crate::stats::{LifeState, ResourcePool};

/// Errors a save backend can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// The backend refused the write (validation, auth, conflict).
    #[error("save rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed internally.
    #[error("save backend failure: {0}")]
    Backend(String),
}

/// A save in flight. The persistence system never awaits it.
pub type SaveFuture = Pin<Box<dyn Future<Output = Result<(), SaveError>> + Send + 'static>>;

/// What a hook did with a save request.
pub enum SaveDispatch {
    /// The save finished synchronously.
    Done(Result<(), SaveError>),
    /// The save continues in the background.
    Pending(SaveFuture),
}

impl fmt::Debug for SaveDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(result) => f.debug_tuple("Done").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// The persistable view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity the snapshot belongs to.
    pub entity: EntityId,
    /// Display name at capture time.
    pub name: String,
    /// Player, monster or NPC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorKind>,
    /// Identity id that survives reloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    /// Scene the entity stood in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    /// Tile position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<TilePos>,
    /// Last facing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
    /// Character level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Health pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<ResourcePool>,
    /// Mana pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mana: Option<ResourcePool>,
    /// Life state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_state: Option<LifeState>,
    /// Wall-clock capture time.
    pub saved_at: DateTime<Utc>,
}

impl EntitySnapshot {
    /// Capture whatever persistable components the entity carries.
    pub fn capture(entity: &Entity) -> Self {
        let c = &entity.components;
        Self {
            entity: entity.id,
            name: entity.name.clone(),
            actor: c.identity.as_ref().map(|i| i.actor),
            stable_id: c.identity.as_ref().map(|i| i.id.clone()),
            scene: entity.scene.clone(),
            position: c.transform.as_ref().map(|t| t.position),
            facing: c.transform.as_ref().map(|t| t.facing),
            level: c.stats.as_ref().map(|s| s.level),
            health: c.stats.as_ref().map(|s| s.health),
            mana: c.stats.as_ref().map(|s| s.mana),
            life_state: c.stats.as_ref().map(|s| s.life.state),
            saved_at: Utc::now(),
        }
    }

    /// Key used by throttles and repositories: the stable id when known,
    /// the entity UUID otherwise.
    pub fn key(&self) -> String {
        self.stable_id
            .clone()
            .unwrap_or_else(|| self.entity.0.to_string())
    }
}

/// Everything a hook gets for one save.
#[derive(Debug, Clone)]
pub struct SaveContext {
    /// Entity being saved.
    pub entity: EntityId,
    /// Captured state.
    pub snapshot: EntitySnapshot,
    /// Simulation time in milliseconds.
    pub now: u64,
}

/// Entity-scoped save callback.
pub trait SaveHook: Send + Sync + fmt::Debug {
    /// Persist one snapshot, inline or as a future.
    fn save(&self, ctx: SaveContext) -> SaveDispatch;
}
