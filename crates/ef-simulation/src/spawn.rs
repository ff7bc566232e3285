//! Component bundles for the three actor kinds.
//!
//! Each builder returns a detached [`Entity`]; hand it to
//! [`Simulation::spawn`](crate::simulation::Simulation::spawn) or
//! [`World::add_entity`](ef_core::world::World::add_entity).

use std::sync::Arc;

use ef_core::capability::GridMover;
use ef_core::component::{
    ActionQueueComponent, AnimationComponent, IdentityComponent, LifecycleComponent,
    MonsterCombatComponent, MovementIntentComponent, MovementStateComponent, NetworkingComponent,
    PathWalkComponent, PersistenceComponent, PlayerCombatComponent, Rarity, TransformComponent,
};
use ef_core::entity::{ActorKind, Entity};
use ef_core::grid::TilePos;
use ef_core::net::Broadcaster;
use ef_core::save::SaveHook;
use ef_core::stats::Attributes;
use ef_mechanics::content::MonsterArchetype;
use ef_mechanics::stats::{LifecycleTuning, initialise};

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Everything needed to bring a player character into the world.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSpec {
    /// Display name.
    pub name: String,
    /// Character id known to storage.
    pub stable_id: String,
    /// Scene to enter.
    pub scene: String,
    /// Spawn tile.
    pub position: TilePos,
    /// Starting level.
    pub level: u32,
    /// Base attributes.
    pub attributes: Attributes,
}

impl PlayerSpec {
    /// A level 1 player with 10 in every attribute.
    pub fn new(
        name: impl Into<String>,
        stable_id: impl Into<String>,
        scene: impl Into<String>,
        position: TilePos,
    ) -> Self {
        Self {
            name: name.into(),
            stable_id: stable_id.into(),
            scene: scene.into(),
            position,
            level: 1,
            attributes: Attributes::new(10, 10, 10, 10),
        }
    }

    /// Set the starting level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set base attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A player: moves, walks paths, uses skills, and is saved when dirty.
pub fn player(
    spec: PlayerSpec,
    broadcaster: Arc<dyn Broadcaster>,
    hook: Arc<dyn SaveHook>,
    save_cooldown_ms: u64,
    tuning: &LifecycleTuning,
) -> Entity {
    let entity = Entity::new(spec.name).in_scene(spec.scene);
    let id = entity.id;
    entity
        .with(IdentityComponent::new(ActorKind::Player, spec.stable_id, id))
        .with(TransformComponent::at(spec.position))
        .with(MovementIntentComponent::default())
        .with(MovementStateComponent::new(Arc::new(GridMover::new())))
        .with(ActionQueueComponent::default())
        .with(NetworkingComponent::new(ActorKind::Player, broadcaster))
        .with(LifecycleComponent::default())
        .with(PersistenceComponent::new(hook).with_cooldown(save_cooldown_ms))
        .with(initialise(spec.level, spec.attributes, tuning))
        .with(PlayerCombatComponent::default())
        .with(AnimationComponent::default())
        .with(PathWalkComponent::default())
}

// ---------------------------------------------------------------------------
// Monsters
// ---------------------------------------------------------------------------

/// Where and as what a monster spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterSpec {
    /// Archetype content id.
    pub archetype: String,
    /// Spawn point id, used as the stable identity.
    pub spawn_id: String,
    /// Scene to enter.
    pub scene: String,
    /// Spawn tile.
    pub position: TilePos,
    /// Rarity tier.
    pub rarity: Rarity,
}

impl MonsterSpec {
    /// A normal-rarity monster.
    pub fn new(
        archetype: impl Into<String>,
        spawn_id: impl Into<String>,
        scene: impl Into<String>,
        position: TilePos,
    ) -> Self {
        Self {
            archetype: archetype.into(),
            spawn_id: spawn_id.into(),
            scene: scene.into(),
            position,
            rarity: Rarity::Normal,
        }
    }

    /// Set the rarity tier.
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }
}

/// A monster leashed to its spawn point.
pub fn monster(
    spec: MonsterSpec,
    archetype: &MonsterArchetype,
    broadcaster: Arc<dyn Broadcaster>,
    tuning: &LifecycleTuning,
) -> Entity {
    let loadout = archetype.loadout(spec.position, spec.rarity, tuning);
    let entity = Entity::new(archetype.name.clone()).in_scene(spec.scene);
    let id = entity.id;
    entity
        .with(IdentityComponent::new(ActorKind::Monster, spec.spawn_id, id))
        .with(TransformComponent::at(spec.position))
        .with(MovementIntentComponent::default())
        .with(MovementStateComponent::new(Arc::new(GridMover::leashed(
            spec.position,
            archetype.leash_radius,
        ))))
        .with(ActionQueueComponent::default())
        .with(NetworkingComponent::new(ActorKind::Monster, broadcaster))
        .with(loadout.behaviour)
        .with(loadout.monster)
        .with(loadout.stats)
        .with(MonsterCombatComponent::default())
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// A non-combat NPC that can be moved or sent wandering within
/// `patrol_radius` tiles of where it stands.
pub fn npc(
    name: impl Into<String>,
    scene: impl Into<String>,
    position: TilePos,
    patrol_radius: u32,
    broadcaster: Arc<dyn Broadcaster>,
) -> Entity {
    let entity = Entity::new(name).in_scene(scene);
    let id = entity.id;
    let stable_id = entity.name.to_lowercase().replace(' ', "-");
    entity
        .with(IdentityComponent::new(ActorKind::Npc, stable_id, id))
        .with(TransformComponent::at(position))
        .with(MovementIntentComponent::default())
        .with(MovementStateComponent::new(Arc::new(GridMover::leashed(
            position,
            patrol_radius,
        ))))
        .with(ActionQueueComponent::default())
        .with(NetworkingComponent::new(ActorKind::Npc, broadcaster))
}
