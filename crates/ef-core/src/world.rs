use std::collections::HashMap;

use crate::component::ComponentKind;
use crate::entity::{ActorKind, Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::query::QueryBuilder;
use crate::terrain::Terrain;

/// The central world model. Owns every entity and the per-scene terrain.
///
/// Entities are iterated in insertion order so a seeded simulation replays
/// identically.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,

    // Indexes
    by_actor: HashMap<ActorKind, Vec<EntityId>>,
    by_scene: HashMap<String, Vec<EntityId>>,

    terrain: HashMap<String, Terrain>,
    default_terrain: Terrain,
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Entity CRUD
    // -----------------------------------------------------------------------

    /// Add an entity to the world. Returns the entity's ID.
    pub fn add_entity(&mut self, entity: Entity) -> CoreResult<EntityId> {
        let id = entity.id;
        if self.entities.contains_key(&id) {
            return Err(CoreError::DuplicateEntity(id));
        }

        if let Some(actor) = entity.actor() {
            self.by_actor.entry(actor).or_default().push(id);
        }
        if let Some(scene) = &entity.scene {
            self.by_scene.entry(scene.clone()).or_default().push(id);
        }
        self.order.push(id);
        self.entities.insert(id, entity);
        tracing::debug!(entity = %id, "entity added");
        Ok(id)
    }

    /// Get a reference to an entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    ///
    /// Callers must not change `scene` or the identity's actor kind through
    /// this reference; re-add the entity instead so the indexes follow.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Like [`World::get_entity`] but reports a missing entity as an error.
    pub fn entity(&self, id: EntityId) -> CoreResult<&Entity> {
        self.entities.get(&id).ok_or(CoreError::EntityNotFound(id))
    }

    /// Like [`World::get_entity_mut`] but reports a missing entity as an error.
    pub fn entity_mut(&mut self, id: EntityId) -> CoreResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))
    }

    /// Whether `id` is still stored.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Remove an entity and drop it from every index.
    pub fn remove_entity(&mut self, id: EntityId) -> CoreResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(CoreError::EntityNotFound(id))?;

        self.order.retain(|eid| *eid != id);
        if let Some(actor) = entity.actor() {
            if let Some(ids) = self.by_actor.get_mut(&actor) {
                ids.retain(|eid| *eid != id);
            }
        }
        if let Some(scene) = &entity.scene {
            if let Some(ids) = self.by_scene.get_mut(scene) {
                ids.retain(|eid| *eid != id);
            }
        }
        tracing::debug!(entity = %id, "entity removed");
        Ok(entity)
    }

    // -----------------------------------------------------------------------
    // Terrain
    // -----------------------------------------------------------------------

    /// Install walkability data for a scene.
    pub fn set_terrain(&mut self, scene: impl Into<String>, terrain: Terrain) {
        self.terrain.insert(scene.into(), terrain);
    }

    /// Terrain used for entities with no scene or a scene without data.
    pub fn set_default_terrain(&mut self, terrain: Terrain) {
        self.default_terrain = terrain;
    }

    /// Terrain for `scene`, if any was registered.
    pub fn terrain(&self, scene: Option<&str>) -> &Terrain {
        scene
            .and_then(|s| self.terrain.get(s))
            .unwrap_or(&self.default_terrain)
    }

    /// Split borrow: one entity mutably, the terrain of its scene immutably.
    pub fn entity_and_terrain_mut(&mut self, id: EntityId) -> Option<(&mut Entity, &Terrain)> {
        let entity = self.entities.get_mut(&id)?;
        let terrain = entity
            .scene
            .as_deref()
            .and_then(|s| self.terrain.get(s))
            .unwrap_or(&self.default_terrain);
        Some((entity, terrain))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// IDs of every entity holding a component of `kind`, in insertion order.
    pub fn query(&self, kind: ComponentKind) -> Vec<EntityId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.entities
                    .get(id)
                    .is_some_and(|e| e.components.has(kind))
            })
            .collect()
    }

    /// Start building a filtered query.
    pub fn select(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// All entities in insertion order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// All entities of an actor kind.
    pub fn entities_by_actor(&self, actor: ActorKind) -> Vec<&Entity> {
        self.by_actor
            .get(&actor)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Entities placed in `scene`.
    pub fn entities_in_scene(&self, scene: &str) -> Vec<&Entity> {
        self.by_scene
            .get(scene)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Players in `scene`, the read-only view monster targeting scans.
    pub fn players_in_scene(&self, scene: &str) -> Vec<&Entity> {
        self.entities_in_scene(scene)
            .into_iter()
            .filter(|e| e.actor() == Some(ActorKind::Player))
            .collect()
    }

    /// Display name for logs and event descriptions.
    pub fn entity_name(&self, id: EntityId) -> String {
        self.entities
            .get(&id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Number of stored entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Count entities by actor kind.
    pub fn entity_counts_by_actor(&self) -> HashMap<ActorKind, usize> {
        self.by_actor
            .iter()
            .map(|(k, ids)| (*k, ids.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{IdentityComponent, TransformComponent};
    use crate::grid::TilePos;

    fn actor(name: &str, kind: ActorKind, scene: &str) -> Entity {
        let entity = Entity::new(name).in_scene(scene);
        let id = entity.id;
        entity
            .with(IdentityComponent::new(kind, name, id))
            .with(TransformComponent::at(TilePos::new(0, 0)))
    }

    #[test]
    fn add_and_get_entity() {
        let mut world = World::new();
        let id = world.add_entity(Entity::new("Kael")).unwrap();
        assert_eq!(world.get_entity(id).unwrap().name, "Kael");
        assert!(world.contains(id));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut world = World::new();
        let entity = Entity::new("Kael");
        let copy = entity.clone();
        world.add_entity(entity).unwrap();
        assert!(matches!(
            world.add_entity(copy),
            Err(CoreError::DuplicateEntity(_))
        ));
    }

    #[test]
    fn query_by_component_keeps_insertion_order() {
        let mut world = World::new();
        let a = world.add_entity(actor("a", ActorKind::Npc, "s")).unwrap();
        world.add_entity(Entity::new("bare")).unwrap();
        let c = world.add_entity(actor("c", ActorKind::Monster, "s")).unwrap();

        assert_eq!(world.query(ComponentKind::Transform), vec![a, c]);
        assert!(world.query(ComponentKind::Stats).is_empty());
    }

    #[test]
    fn players_in_scene_filters_actor_and_scene() {
        let mut world = World::new();
        let p1 = world.add_entity(actor("p1", ActorKind::Player, "harbor")).unwrap();
        world.add_entity(actor("p2", ActorKind::Player, "crypt")).unwrap();
        world.add_entity(actor("rat", ActorKind::Monster, "harbor")).unwrap();

        let players: Vec<EntityId> = world
            .players_in_scene("harbor")
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(players, vec![p1]);
        assert_eq!(world.entities_in_scene("harbor").len(), 2);
    }

    #[test]
    fn remove_entity_clears_indexes() {
        let mut world = World::new();
        let id = world.add_entity(actor("p1", ActorKind::Player, "harbor")).unwrap();
        world.remove_entity(id).unwrap();

        assert!(world.players_in_scene("harbor").is_empty());
        assert!(world.entities_by_actor(ActorKind::Player).is_empty());
        assert!(world.query(ComponentKind::Transform).is_empty());
        assert!(matches!(
            world.remove_entity(id),
            Err(CoreError::EntityNotFound(_))
        ));
    }

    #[test]
    fn terrain_falls_back_to_default() {
        let mut world = World::new();
        let mut crypt = Terrain::open();
        crypt.block(TilePos::new(1, 1));
        world.set_terrain("crypt", crypt);

        assert!(!world.terrain(Some("crypt")).is_walkable(TilePos::new(1, 1)));
        assert!(world.terrain(Some("harbor")).is_walkable(TilePos::new(1, 1)));
        assert!(world.terrain(None).is_walkable(TilePos::new(1, 1)));
    }
}
