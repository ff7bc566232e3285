use crate::component::ComponentKind;
use crate::entity::{ActorKind, Entity};
use crate::grid::TilePos;
use crate::world::World;

/// A builder for filtering entities in a world.
///
/// Results keep the world's insertion order, so callers that break ties by
/// "first match" stay deterministic.
pub struct QueryBuilder<'w> {
    world: &'w World,
    required: Vec<ComponentKind>,
    actor_filter: Option<ActorKind>,
    scene_filter: Option<String>,
    within: Option<(TilePos, u32)>,
    alive_only: bool,
    limit: Option<usize>,
}

impl<'w> QueryBuilder<'w> {
    /// Start a query matching every entity in `world`.
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            required: Vec::new(),
            actor_filter: None,
            scene_filter: None,
            within: None,
            alive_only: false,
            limit: None,
        }
    }

    /// Require a component kind. May be called repeatedly; all must match.
    pub fn with(mut self, kind: ComponentKind) -> Self {
        self.required.push(kind);
        self
    }

    /// Filter by actor kind.
    pub fn actor(mut self, actor: ActorKind) -> Self {
        self.actor_filter = Some(actor);
        self
    }

    /// Filter to entities placed in `scene`.
    pub fn scene(mut self, scene: impl Into<String>) -> Self {
        self.scene_filter = Some(scene.into());
        self
    }

    /// Filter to entities whose transform is within `radius` tiles
    /// (Manhattan) of `center`. Entities without a transform never match.
    pub fn within(mut self, center: TilePos, radius: u32) -> Self {
        self.within = Some((center, radius));
        self
    }

    /// Skip dead entities.
    pub fn alive(mut self) -> Self {
        self.alive_only = true;
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Execute the query and return matching entities.
    pub fn execute(self) -> Vec<&'w Entity> {
        let limit = self.limit.unwrap_or(usize::MAX);
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .take(limit)
            .collect()
    }

    /// Count matching entities without collecting them.
    pub fn count(self) -> usize {
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .count()
    }

    fn matches(&self, entity: &Entity) -> bool {
        if !self.required.iter().all(|k| entity.components.has(*k)) {
            return false;
        }

        if let Some(actor) = self.actor_filter {
            if entity.actor() != Some(actor) {
                return false;
            }
        }

        if let Some(ref scene) = self.scene_filter {
            if entity.scene.as_deref() != Some(scene.as_str()) {
                return false;
            }
        }

        if let Some((center, radius)) = self.within {
            let in_range = entity
                .components
                .transform
                .as_ref()
                .is_some_and(|t| t.position.manhattan(center) <= radius);
            if !in_range {
                return false;
            }
        }

        if self.alive_only && !entity.is_alive() {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{IdentityComponent, TransformComponent};
    use crate::stats::{Attributes, LifeState, StatsComponent};

    fn spawn(world: &mut World, name: &str, kind: ActorKind, scene: &str, pos: TilePos) {
        let entity = Entity::new(name).in_scene(scene);
        let id = entity.id;
        let entity = entity
            .with(IdentityComponent::new(kind, name, id))
            .with(TransformComponent::at(pos));
        world.add_entity(entity).unwrap();
    }

    fn test_world() -> World {
        let mut world = World::new();
        spawn(&mut world, "Kael", ActorKind::Player, "harbor", TilePos::new(0, 0));
        spawn(&mut world, "Elara", ActorKind::Player, "harbor", TilePos::new(6, 0));
        spawn(&mut world, "Rat", ActorKind::Monster, "harbor", TilePos::new(1, 1));
        spawn(&mut world, "Ghoul", ActorKind::Monster, "crypt", TilePos::new(0, 0));
        world
    }

    #[test]
    fn query_by_actor_and_scene() {
        let world = test_world();
        let results = world
            .select()
            .actor(ActorKind::Monster)
            .scene("harbor")
            .execute();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Rat");
    }

    #[test]
    fn query_within_radius() {
        let world = test_world();
        let names: Vec<&str> = world
            .select()
            .scene("harbor")
            .within(TilePos::new(0, 0), 2)
            .execute()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Kael", "Rat"]);
    }

    #[test]
    fn query_requires_components() {
        let world = test_world();
        assert_eq!(world.select().with(ComponentKind::Transform).count(), 4);
        assert_eq!(world.select().with(ComponentKind::Stats).count(), 0);
    }

    #[test]
    fn query_alive_skips_dead() {
        let mut world = test_world();
        let mut stats = StatsComponent::new(1, Attributes::default());
        stats.life.state = LifeState::AwaitingRespawn;
        let corpse = Entity::new("Corpse").with(stats);
        world.add_entity(corpse).unwrap();

        assert_eq!(world.select().count(), 5);
        assert_eq!(world.select().alive().count(), 4);
    }

    #[test]
    fn query_limit_keeps_insertion_order() {
        let world = test_world();
        let results = world.select().limit(2).execute();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Kael");
        assert_eq!(results[1].name, "Elara");
    }
}
