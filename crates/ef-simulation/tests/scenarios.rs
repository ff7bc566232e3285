//! End-to-end scenarios driven through the public `Simulation` API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ef_core::capability::GridMover;
use ef_core::component::{Action, AnimationState, BehaviourComponent, DamageRange, MoveIntent};
use ef_core::entity::EntityId;
use ef_core::grid::{Direction, Facing, TilePos};
use ef_core::net::RecordingBroadcaster;
use ef_core::save::{EntitySnapshot, SaveContext, SaveDispatch, SaveHook};
use ef_core::stats::Attributes;
use ef_core::terrain::Terrain;
use ef_core::world::World;
use ef_mechanics::combat::matches_combo;
use ef_mechanics::content::{ContentTable, MonsterArchetype, SkillDefinition};
use ef_simulation::action_queue::RANDOM_WALK;
use ef_simulation::pathing::find_path;
use ef_simulation::persistence::{InMemoryPlayerRepository, RepositorySaveHook};
use ef_simulation::spawn::{MonsterSpec, PlayerSpec};
use ef_simulation::{SimConfig, SimEventKind, Simulation};
use proptest::prelude::*;

#[derive(Debug, Default)]
struct CountingHook {
    calls: AtomicUsize,
}

impl SaveHook for CountingHook {
    fn save(&self, _ctx: SaveContext) -> SaveDispatch {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SaveDispatch::Done(Ok(()))
    }
}

fn content() -> ContentTable {
    let mut table = ContentTable::new();
    table.add_monster(MonsterArchetype {
        id: "dock-crab".into(),
        name: "Dock Crab".into(),
        level: 1,
        attributes: Attributes::new(6, 2, 0, 4),
        damage: DamageRange::new(2, 5),
        behaviour: BehaviourComponent {
            random_walk_interval_ms: None,
            ..Default::default()
        },
        leash_radius: 6,
    });
    table.add_skill(SkillDefinition {
        id: "slash".into(),
        name: "Slash".into(),
        animation_ms: None,
        requires_target: false,
    });
    table
}

struct Harbor {
    sim: Simulation,
    net: Arc<RecordingBroadcaster>,
    hook: Arc<CountingHook>,
}

impl Harbor {
    fn new(config: SimConfig) -> Self {
        let sim = Simulation::new(World::new(), config)
            .with_content(Arc::new(content()))
            .with_default_systems();
        Self {
            sim,
            net: Arc::new(RecordingBroadcaster::new()),
            hook: Arc::new(CountingHook::default()),
        }
    }

    fn player(&mut self, at: TilePos) -> EntityId {
        let id = self.sim.spawn_player(
            PlayerSpec::new("Kael", "char-1", "harbor", at),
            self.net.clone(),
            self.hook.clone(),
        );
        self.sim.update(0).unwrap();
        id
    }

    fn crab(&mut self, at: TilePos) -> EntityId {
        let id = self
            .sim
            .spawn_monster(
                MonsterSpec::new("dock-crab", "crab-1", "harbor", at),
                self.net.clone(),
            )
            .unwrap();
        self.sim.update(0).unwrap();
        id
    }

    fn position(&self, id: EntityId) -> TilePos {
        self.sim
            .world()
            .get_entity(id)
            .and_then(|e| e.components.transform.as_ref())
            .map(|t| t.position)
            .unwrap()
    }

    fn facing(&self, id: EntityId) -> Facing {
        self.sim
            .world()
            .get_entity(id)
            .and_then(|e| e.components.transform.as_ref())
            .map(|t| t.facing)
            .unwrap()
    }

    fn use_skill(&mut self, id: EntityId, skill: &str) {
        let action = Action::skill(skill, None);
        self.sim.enqueue_action(id, action).unwrap();
    }

    fn count(&self, pred: impl Fn(&SimEventKind) -> bool) -> usize {
        self.sim.events().filter(pred).len()
    }
}

// ============================================================
// Movement
// ============================================================

#[test]
fn east_step_end_to_end() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    h.sim
        .world_mut()
        .get_entity_mut(id)
        .and_then(|e| e.components.transform.as_mut())
        .unwrap()
        .facing = Facing::South;
    assert_eq!(h.facing(id), Facing::South);

    h.sim
        .enqueue_action(id, Action::Move(MoveIntent::new(Direction::East)))
        .unwrap();
    h.sim.tick().unwrap();

    assert_eq!(h.position(id), TilePos::new(1, 0));
    assert_eq!(h.facing(id), Facing::East);
    let entity = h.sim.world().get_entity(id).unwrap();
    assert!(entity.components.movement_intent.as_ref().unwrap().queue.is_empty());
    assert!(entity.components.action_queue.as_ref().unwrap().queue.is_empty());

    let sent = h.net.events_named("player:movement");
    assert_eq!(sent.len(), 1);
    let data = &sent[0].envelope.data;
    assert_eq!(data["x"], 1);
    assert_eq!(data["y"], 0);
    assert_eq!(data["sequence"], 1);
    assert_eq!(data["duration_ms"], 150);
    assert_eq!(data["blocked"], false);

    // Saved in the same tick, flags cleared on dispatch.
    assert_eq!(h.hook.calls.load(Ordering::SeqCst), 1);
    let entity = h.sim.world().get_entity(id).unwrap();
    assert!(!entity.components.lifecycle.unwrap().dirty);
    assert!(!entity.components.persistence.as_ref().unwrap().dirty);
    assert_eq!(
        h.count(|k| matches!(k, SimEventKind::Moved { entity, .. } if *entity == id)),
        1
    );
}

#[test]
fn idle_entities_are_not_rebroadcast() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    h.sim
        .enqueue_action(id, Action::Move(MoveIntent::new(Direction::South)))
        .unwrap();

    h.sim.run(40).unwrap();

    assert_eq!(h.net.count("player:movement"), 1);
}

#[test]
fn diagonal_steps_take_longer() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    h.sim
        .enqueue_action(id, Action::Move(MoveIntent::new(Direction::SouthEast)))
        .unwrap();
    h.sim.tick().unwrap();

    let duration = h
        .sim
        .world()
        .get_entity(id)
        .and_then(|e| e.components.transform.as_ref())
        .map(|t| t.step.duration_ms)
        .unwrap();
    assert_eq!(duration, 212);
    assert_eq!(h.position(id), TilePos::new(1, 1));
}

// ============================================================
// Action queue
// ============================================================

#[test]
fn ai_action_defers_while_mid_step() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    h.sim
        .enqueue_action(id, Action::Move(MoveIntent::new(Direction::East)))
        .unwrap();
    h.sim.enqueue_action(id, Action::ai(RANDOM_WALK)).unwrap();

    // t=50 steps east (until 200); t=100 and t=150 defer.
    h.sim.run(3).unwrap();
    {
        let queue = h
            .sim
            .world()
            .get_entity(id)
            .and_then(|e| e.components.action_queue.as_ref())
            .unwrap();
        assert_eq!(queue.queue.front(), Some(&Action::ai(RANDOM_WALK)));
        assert_eq!(queue.last_processed_at, Some(50));
        assert!(queue.active.is_none());
    }

    h.sim.tick().unwrap();
    let queue = h
        .sim
        .world()
        .get_entity(id)
        .and_then(|e| e.components.action_queue.as_ref())
        .unwrap();
    assert!(queue.queue.is_empty());
    assert_eq!(queue.last_processed_at, Some(200));
    assert_ne!(h.position(id), TilePos::new(1, 0));
}

// ============================================================
// Walks
// ============================================================

#[test]
fn cancelled_walk_leaves_no_trailing_steps() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    assert!(h.sim.walk_to(id, TilePos::new(5, 0)).unwrap());

    h.sim.run(2).unwrap();
    assert!(h.sim.cancel_walk(id));
    h.sim.run(20).unwrap();

    assert_eq!(h.position(id), TilePos::new(1, 0));
    assert_eq!(h.count(|k| matches!(k, SimEventKind::WalkFinished { .. })), 0);
    assert!(h.sim.timers().is_empty());
}

#[test]
fn walk_steps_are_timed_in_milliseconds() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    assert!(h.sim.walk_to(id, TilePos::new(0, 2)).unwrap());

    // Straight down: steps at 50 and 200, arrival noticed at 350.
    h.sim.run(7).unwrap();

    assert_eq!(h.position(id), TilePos::new(0, 2));
    assert_eq!(h.count(|k| matches!(k, SimEventKind::WalkFinished { .. })), 1);
    assert!(h.sim.timers().is_empty());
}

#[test]
fn follow_up_action_runs_before_the_stop_broadcast() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    assert!(
        h.sim
            .walk_to_then(id, TilePos::new(1, 0), vec![Action::skill("slash", None)])
            .unwrap()
    );

    h.sim.run(5).unwrap();

    let order: Vec<String> = h
        .net
        .deliveries()
        .into_iter()
        .map(|d| d.envelope.event)
        .collect();
    assert_eq!(order, ["player:movement", "player:skill", "player:idle"]);
    assert_eq!(h.count(|k| matches!(k, SimEventKind::SkillAccepted { .. })), 1);
}

#[test]
fn new_walk_supersedes_old_one() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));
    h.sim.walk_to(id, TilePos::new(5, 0)).unwrap();
    h.sim.run(1).unwrap();
    h.sim.walk_to(id, TilePos::new(1, 3)).unwrap();

    h.sim.run(20).unwrap();

    assert_eq!(h.position(id), TilePos::new(1, 3));
    assert_eq!(h.count(|k| matches!(k, SimEventKind::WalkFinished { .. })), 1);
}

// ============================================================
// Player combat
// ============================================================

fn animation(h: &Harbor, id: EntityId) -> AnimationState {
    h.sim
        .world()
        .get_entity(id)
        .and_then(|e| e.components.animation.as_ref())
        .map(|a| a.state)
        .unwrap()
}

#[test]
fn superseded_animation_timer_is_dropped() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));

    h.use_skill(id, "slash");
    h.sim.tick().unwrap(); // t=50: attack until 350
    assert_eq!(animation(&h, id), AnimationState::Attack);

    h.sim.run(6).unwrap(); // t=350: hold until 600
    assert_eq!(animation(&h, id), AnimationState::Hold);

    h.use_skill(id, "slash");
    h.sim.tick().unwrap(); // t=400: second attack until 700
    assert_eq!(animation(&h, id), AnimationState::Attack);

    // The first hold's revert at 600 belongs to the old sequence.
    h.sim.run(5).unwrap();
    assert_eq!(animation(&h, id), AnimationState::Attack);
    h.sim.tick().unwrap();
    assert_eq!(animation(&h, id), AnimationState::Hold);
    h.sim.run(5).unwrap();
    assert_eq!(animation(&h, id), AnimationState::Idle);

    let combat = h
        .sim
        .world()
        .get_entity(id)
        .and_then(|e| e.components.player_combat.as_ref())
        .unwrap();
    assert_eq!(combat.sequence, 2);
    assert!(matches_combo(combat, &["slash", "slash"]));
    assert_eq!(h.net.count("player:skill"), 2);
}

#[test]
fn skill_inside_cooldown_is_rejected() {
    let mut h = Harbor::new(SimConfig::default());
    let id = h.player(TilePos::new(0, 0));

    h.use_skill(id, "slash");
    h.use_skill(id, "slash");
    h.use_skill(id, "fireball");
    h.sim.run(3).unwrap();

    assert_eq!(h.count(|k| matches!(k, SimEventKind::SkillAccepted { .. })), 1);
    assert_eq!(h.count(|k| matches!(k, SimEventKind::SkillRejected { .. })), 2);
}

// ============================================================
// Monster combat
// ============================================================

#[test]
fn aggression_range_gates_targeting() {
    let mut h = Harbor::new(SimConfig::default());
    let crab = h.crab(TilePos::new(0, 0));
    let player = h.player(TilePos::new(5, 0));

    h.sim.run(3).unwrap();
    assert_eq!(h.count(|k| matches!(k, SimEventKind::TargetAcquired { .. })), 0);
    assert_eq!(h.position(crab), TilePos::new(0, 0));

    h.sim
        .world_mut()
        .get_entity_mut(player)
        .and_then(|e| e.components.transform.as_mut())
        .unwrap()
        .position = TilePos::new(3, 0);
    h.sim.tick().unwrap();

    assert_eq!(
        h.count(|k| matches!(
            k,
            SimEventKind::TargetAcquired { entity, target } if *entity == crab && *target == player
        )),
        1
    );
    // Pursuit closes the distance.
    assert_eq!(h.position(crab), TilePos::new(1, 0));
}

#[test]
fn windup_attack_lands_after_delay() {
    let mut h = Harbor::new(SimConfig::default());
    let crab = h.crab(TilePos::new(1, 0));
    let player = h.player(TilePos::new(0, 0));
    let max = h
        .sim
        .world()
        .get_entity(player)
        .and_then(|e| e.components.stats.as_ref())
        .map(|s| s.health.max)
        .unwrap();

    h.sim.tick().unwrap(); // t=50: committed, resolves at 450
    assert_eq!(
        h.count(|k| matches!(k, SimEventKind::AttackCommitted { entity, .. } if *entity == crab)),
        1
    );
    assert_eq!(h.net.count("monster:attack"), 1);

    h.sim.run(7).unwrap(); // t=400
    assert_eq!(h.count(|k| matches!(k, SimEventKind::AttackResolved { .. })), 0);
    assert_eq!(h.count(|k| matches!(k, SimEventKind::AttackCommitted { .. })), 1);

    h.sim.tick().unwrap(); // t=450
    let health = h
        .sim
        .world()
        .get_entity(player)
        .and_then(|e| e.components.stats.as_ref())
        .map(|s| s.health.current)
        .unwrap();
    assert!(health < max);
    assert_eq!(h.count(|k| matches!(k, SimEventKind::AttackResolved { .. })), 1);
    assert_eq!(h.net.count("player:damage"), 1);
}

#[test]
fn attack_fizzles_when_target_steps_away() {
    let mut h = Harbor::new(SimConfig::default());
    h.crab(TilePos::new(1, 0));
    let player = h.player(TilePos::new(0, 0));

    h.sim.tick().unwrap(); // committed at 50
    h.sim
        .world_mut()
        .get_entity_mut(player)
        .and_then(|e| e.components.transform.as_mut())
        .unwrap()
        .position = TilePos::new(-3, 0);
    h.sim.run(8).unwrap(); // past 450

    assert_eq!(h.count(|k| matches!(k, SimEventKind::AttackFizzled { .. })), 1);
    assert_eq!(h.count(|k| matches!(k, SimEventKind::AttackResolved { .. })), 0);
}

// ============================================================
// Persistence
// ============================================================

#[tokio::test]
async fn walking_player_saves_are_throttled() {
    let repo = Arc::new(InMemoryPlayerRepository::new());
    let mut sim = Simulation::new(
        World::new(),
        SimConfig::default().with_player_save_cooldown_ms(1_000),
    )
    .with_default_systems();
    let id = sim.spawn_player(
        PlayerSpec::new("Kael", "char-9", "harbor", TilePos::new(0, 0)),
        Arc::new(RecordingBroadcaster::new()),
        Arc::new(RepositorySaveHook::new(repo.clone())),
    );
    sim.update(0).unwrap();
    assert!(sim.walk_to(id, TilePos::new(12, 0)).unwrap());

    // Dirty on every step until 1700: saves at 50 and 1050.
    sim.run(40).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(repo.save_count(), 2);
    let snapshot: EntitySnapshot = repo.get("char-9").unwrap();
    assert_eq!(snapshot.name, "Kael");
    assert!(snapshot.position.is_some());
}

// ============================================================
// Pathing properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_open_terrain_paths_are_shortest(
        fx in -10i32..10, fy in -10i32..10,
        tx in -10i32..10, ty in -10i32..10,
    ) {
        let from = TilePos::new(fx, fy);
        let to = TilePos::new(tx, ty);
        let path = find_path(&Terrain::open(), &GridMover::new(), from, to, 10_000).unwrap();

        let chebyshev = (fx - tx).unsigned_abs().max((fy - ty).unsigned_abs()) as usize;
        prop_assert_eq!(path.len(), chebyshev);
        let end = path.iter().fold(from, |at, d| at.step(*d));
        prop_assert_eq!(end, to);
    }
}
