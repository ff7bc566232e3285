use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::ComponentSet;

/// Unique identifier for every entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// What sort of actor an entity represents. Drives broadcast channels and
/// the scene indexes; capabilities are still decided by component presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A connected player character.
    Player,
    /// A non-hostile scripted character.
    Npc,
    /// A hostile creature driven by the monster combat controller.
    Monster,
}

impl ActorKind {
    /// Stable lowercase name used as the broadcast channel prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Npc => "npc",
            Self::Monster => "monster",
        }
    }

    /// Channel name for an event of this actor kind, e.g. `monster:movement`.
    pub fn channel(self, event: &str) -> String {
        format!("{}:{event}", self.as_str())
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core entity struct: an identity plus an open set of components.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Display name of the entity.
    pub name: String,
    /// Scene (map instance) the entity lives in, if placed.
    pub scene: Option<String>,
    /// Typed component data attached to this entity.
    pub components: ComponentSet,
    /// Timestamp when the entity was created.
    pub created_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity with a random ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::new(), name)
    }

    /// Create an entity with a pre-assigned ID.
    ///
    /// Used when a player logs back in and must keep the UUID the storage
    /// layer already knows.
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scene: None,
            components: ComponentSet::default(),
            created_at: Utc::now(),
        }
    }

    /// Place the entity in a scene.
    pub fn in_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    /// Attach a component, replacing any existing one of the same kind.
    pub fn with(mut self, component: impl Into<crate::component::Component>) -> Self {
        self.components.insert(component.into());
        self
    }

    /// The actor kind from the identity component, if present.
    pub fn actor(&self) -> Option<ActorKind> {
        self.components.identity.as_ref().map(|i| i.actor)
    }

    /// Whether the stats pipeline considers this entity able to act.
    /// Entities without stats are treated as alive.
    pub fn is_alive(&self) -> bool {
        self.components
            .stats
            .as_ref()
            .is_none_or(|s| s.life.state.is_alive())
    }

    /// Flag the entity's state as changed so the next persistence pass
    /// picks it up.
    pub fn mark_dirty(&mut self, now: u64) {
        if let Some(lifecycle) = self.components.lifecycle.as_mut() {
            lifecycle.dirty = true;
            lifecycle.last_dirty_at = Some(now);
        }
        if let Some(persistence) = self.components.persistence.as_mut() {
            persistence.dirty = true;
        }
    }
}
