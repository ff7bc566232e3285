use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::capability::MovementHandler;
use crate::entity::{ActorKind, EntityId};
use crate::grid::{Direction, Facing, TilePos};
use crate::net::Broadcaster;
use crate::save::SaveHook;
use crate::stats::StatsComponent;

/// Tag naming each component kind. Capabilities are checked against these
/// tags, never against the entity's actor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Grid position, facing, and the current step.
    Transform,
    /// Queued step requests.
    MovementIntent,
    /// The movement handler capability.
    MovementState,
    /// Per-entity action queue.
    ActionQueue,
    /// Actor kind and stable storage id.
    Identity,
    /// Broadcaster and movement channel.
    Networking,
    /// Lifecycle dirty flag.
    Lifecycle,
    /// Save hook and throttle state.
    Persistence,
    /// Attributes and resource pools.
    Stats,
    /// AI tuning.
    Behaviour,
    /// Archetype, rarity, and damage.
    Monster,
    /// Monster combat controller state.
    MonsterCombat,
    /// Player combat controller state.
    PlayerCombat,
    /// Animation state machine.
    Animation,
    /// Multi-tile walk.
    PathWalk,
}

impl ComponentKind {
    /// Kebab-case tag, e.g. `movement-intent`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::MovementIntent => "movement-intent",
            Self::MovementState => "movement-state",
            Self::ActionQueue => "action-queue",
            Self::Identity => "identity",
            Self::Networking => "networking",
            Self::Lifecycle => "lifecycle",
            Self::Persistence => "persistence",
            Self::Stats => "stats",
            Self::Behaviour => "behaviour",
            Self::Monster => "monster",
            Self::MonsterCombat => "monster-combat",
            Self::PlayerCombat => "player-combat",
            Self::Animation => "animation",
            Self::PathWalk => "path-walk",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of typed components attached to an entity.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    /// See [`TransformComponent`].
    pub transform: Option<TransformComponent>,
    /// See [`MovementIntentComponent`].
    pub movement_intent: Option<MovementIntentComponent>,
    /// See [`MovementStateComponent`].
    pub movement_state: Option<MovementStateComponent>,
    /// See [`ActionQueueComponent`].
    pub action_queue: Option<ActionQueueComponent>,
    /// See [`IdentityComponent`].
    pub identity: Option<IdentityComponent>,
    /// See [`NetworkingComponent`].
    pub networking: Option<NetworkingComponent>,
    /// See [`LifecycleComponent`].
    pub lifecycle: Option<LifecycleComponent>,
    /// See [`PersistenceComponent`].
    pub persistence: Option<PersistenceComponent>,
    /// See [`StatsComponent`].
    pub stats: Option<StatsComponent>,
    /// See [`BehaviourComponent`].
    pub behaviour: Option<BehaviourComponent>,
    /// See [`MonsterComponent`].
    pub monster: Option<MonsterComponent>,
    /// See [`MonsterCombatComponent`].
    pub monster_combat: Option<MonsterCombatComponent>,
    /// See [`PlayerCombatComponent`].
    pub player_combat: Option<PlayerCombatComponent>,
    /// See [`AnimationComponent`].
    pub animation: Option<AnimationComponent>,
    /// See [`PathWalkComponent`].
    pub path_walk: Option<PathWalkComponent>,
}

/// A single component value, used for tag-based insertion.
#[derive(Debug, Clone)]
pub enum Component {
    /// A [`TransformComponent`].
    Transform(TransformComponent),
    /// A [`MovementIntentComponent`].
    MovementIntent(MovementIntentComponent),
    /// A [`MovementStateComponent`].
    MovementState(MovementStateComponent),
    /// An [`ActionQueueComponent`].
    ActionQueue(ActionQueueComponent),
    /// An [`IdentityComponent`].
    Identity(IdentityComponent),
    /// A [`NetworkingComponent`].
    Networking(NetworkingComponent),
    /// A [`LifecycleComponent`].
    Lifecycle(LifecycleComponent),
    /// A [`PersistenceComponent`].
    Persistence(PersistenceComponent),
    /// A [`StatsComponent`].
    Stats(StatsComponent),
    /// A [`BehaviourComponent`].
    Behaviour(BehaviourComponent),
    /// A [`MonsterComponent`].
    Monster(MonsterComponent),
    /// A [`MonsterCombatComponent`].
    MonsterCombat(MonsterCombatComponent),
    /// A [`PlayerCombatComponent`].
    PlayerCombat(PlayerCombatComponent),
    /// An [`AnimationComponent`].
    Animation(AnimationComponent),
    /// A [`PathWalkComponent`].
    PathWalk(PathWalkComponent),
}

macro_rules! component_table {
    ($($variant:ident => $field:ident : $ty:ty),* $(,)?) => {
        impl Component {
            /// The tag of this component.
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $(Self::$variant(_) => ComponentKind::$variant,)*
                }
            }
        }

        $(
            impl From<$ty> for Component {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*

        impl ComponentSet {
            /// Attach a component, replacing any existing one of that kind.
            pub fn insert(&mut self, component: Component) {
                match component {
                    $(Component::$variant(value) => self.$field = Some(value),)*
                }
            }

            /// Whether a component of `kind` is present.
            pub fn has(&self, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$variant => self.$field.is_some(),)*
                }
            }

            /// Detach and return the component of `kind`, if any.
            pub fn remove(&mut self, kind: ComponentKind) -> Option<Component> {
                match kind {
                    $(ComponentKind::$variant => self.$field.take().map(Component::$variant),)*
                }
            }

            /// Tags of every component currently attached.
            pub fn kinds(&self) -> Vec<ComponentKind> {
                let mut kinds = Vec::new();
                $(
                    if self.$field.is_some() {
                        kinds.push(ComponentKind::$variant);
                    }
                )*
                kinds
            }
        }
    };
}

component_table! {
    Transform => transform: TransformComponent,
    MovementIntent => movement_intent: MovementIntentComponent,
    MovementState => movement_state: MovementStateComponent,
    ActionQueue => action_queue: ActionQueueComponent,
    Identity => identity: IdentityComponent,
    Networking => networking: NetworkingComponent,
    Lifecycle => lifecycle: LifecycleComponent,
    Persistence => persistence: PersistenceComponent,
    Stats => stats: StatsComponent,
    Behaviour => behaviour: BehaviourComponent,
    Monster => monster: MonsterComponent,
    MonsterCombat => monster_combat: MonsterCombatComponent,
    PlayerCombat => player_combat: PlayerCombatComponent,
    Animation => animation: AnimationComponent,
    PathWalk => path_walk: PathWalkComponent,
}

// ---------------------------------------------------------------------------
// Transform & movement
// ---------------------------------------------------------------------------

/// The most recent step an actor took (or tried to take).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementStep {
    /// Increments on every step attempt. Zero means the actor never moved.
    pub sequence: u64,
    /// When the step started, in simulation milliseconds.
    pub started_at: u64,
    /// How long the step takes.
    pub duration_ms: u64,
    /// Direction of the step, if any.
    pub direction: Option<Direction>,
    /// The step was refused and only turned the actor.
    pub blocked: bool,
}

impl MovementStep {
    /// When the step completes.
    pub fn ends_at(&self) -> u64 {
        self.started_at + self.duration_ms
    }

    /// Whether the actor is free to start another step.
    pub fn is_finished(&self, now: u64) -> bool {
        self.sequence == 0 || now >= self.ends_at()
    }
}

/// Where an actor stands and which way it faces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformComponent {
    /// Current tile.
    pub position: TilePos,
    /// Facing shown to clients.
    pub facing: Facing,
    /// The latest step.
    pub step: MovementStep,
}

impl TransformComponent {
    /// A transform standing at `position`, facing south.
    pub fn at(position: TilePos) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder: set the facing.
    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }
}

/// Who produced a movement intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Typed by a client.
    #[default]
    Input,
    /// Fed by a path walk.
    Path,
    /// Monster pursuit.
    Pursuit,
    /// Idle wandering.
    Wander,
}

/// A queued request to step once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Where to step.
    pub direction: Direction,
    /// Put the intent back at the head of the queue if the step fails.
    pub requeue_on_fail: bool,
    /// Who asked for the step.
    pub source: IntentSource,
}

impl MoveIntent {
    /// A client step in `direction`.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            requeue_on_fail: false,
            source: IntentSource::Input,
        }
    }

    /// Builder: retry at the head of the queue after a failed step.
    pub fn requeue_on_fail(mut self) -> Self {
        self.requeue_on_fail = true;
        self
    }

    /// Builder: tag the intent's origin.
    pub fn from_source(mut self, source: IntentSource) -> Self {
        self.source = source;
        self
    }
}

/// Steps waiting for the movement system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementIntentComponent {
    /// Pending step requests, oldest first.
    pub queue: VecDeque<MoveIntent>,
    /// The intent being resolved this tick.
    pub current: Option<MoveIntent>,
    /// The last intent resolved.
    pub last: Option<MoveIntent>,
}

impl MovementIntentComponent {
    /// Append an intent.
    pub fn push(&mut self, intent: MoveIntent) {
        self.queue.push_back(intent);
    }

    /// Nothing queued and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.current.is_none()
    }
}

/// Identity of a movement for broadcast dedup. Ordered so a newer step
/// always compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MovementSignature {
    /// Step sequence.
    pub sequence: u64,
    /// Step start time.
    pub started_at: u64,
    /// Step direction.
    pub direction: Option<Direction>,
}

impl From<&MovementStep> for MovementSignature {
    fn from(step: &MovementStep) -> Self {
        Self {
            sequence: step.sequence,
            started_at: step.started_at,
            direction: step.direction,
        }
    }
}

/// How an entity moves, plus broadcast dedup state.
#[derive(Debug, Clone)]
pub struct MovementStateComponent {
    /// Resolves steps for this entity.
    pub handler: Arc<dyn MovementHandler>,
    /// Client slot for players.
    pub player_index: Option<u32>,
    /// Source of the last resolved intent.
    pub last_intent_type: Option<IntentSource>,
    /// Signature of the last movement broadcast.
    pub last_broadcast: Option<MovementSignature>,
}

impl MovementStateComponent {
    /// Movement through `handler` with nothing broadcast yet.
    pub fn new(handler: Arc<dyn MovementHandler>) -> Self {
        Self {
            handler,
            player_index: None,
            last_intent_type: None,
            last_broadcast: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Action queue
// ---------------------------------------------------------------------------

/// Dispatcher key for an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// A single step.
    Move,
    /// A named AI behaviour.
    Ai,
    /// A player skill.
    UseSkill,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Ai => write!(f, "ai"),
            Self::UseSkill => write!(f, "use-skill"),
        }
    }
}

/// An AI decision, resolved against the behaviour registry by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAction {
    /// Registry name, e.g. `random-walk`.
    pub behaviour: String,
    /// Behaviour-specific arguments.
    #[serde(default)]
    pub payload: Value,
}

/// A request to use a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillUse {
    /// Content id of the skill.
    pub skill_id: String,
    /// Who the skill is aimed at.
    pub target: Option<EntityId>,
    /// Client payload, kept in the input history.
    #[serde(default)]
    pub data: Value,
}

/// A pending intent in an entity's action queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Queue a step.
    Move(MoveIntent),
    /// Run an AI behaviour.
    Ai(AiAction),
    /// Use a skill.
    UseSkill(SkillUse),
}

impl Action {
    /// Dispatcher key.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Move(_) => ActionKind::Move,
            Self::Ai(_) => ActionKind::Ai,
            Self::UseSkill(_) => ActionKind::UseSkill,
        }
    }

    /// An `ai` action for `behaviour` with no payload.
    pub fn ai(behaviour: impl Into<String>) -> Self {
        Self::Ai(AiAction {
            behaviour: behaviour.into(),
            payload: Value::Null,
        })
    }

    /// A `use-skill` action with no payload.
    pub fn skill(skill_id: impl Into<String>, target: Option<EntityId>) -> Self {
        Self::UseSkill(SkillUse {
            skill_id: skill_id.into(),
            target,
            data: Value::Null,
        })
    }
}

/// Actions waiting to run, one per tick from the head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionQueueComponent {
    /// Pending actions, oldest first.
    pub queue: VecDeque<Action>,
    /// The action being handled right now.
    pub active: Option<Action>,
    /// When an action last completed or failed.
    pub last_processed_at: Option<u64>,
    /// Tick the head was last run on, deferred runs included.
    pub last_run_tick: Option<u64>,
}

impl ActionQueueComponent {
    /// Append an action.
    pub fn enqueue(&mut self, action: Action) {
        self.queue.push_back(action);
    }
}

// ---------------------------------------------------------------------------
// Identity, networking, lifecycle, persistence
// ---------------------------------------------------------------------------

/// Who an entity is, for clients and storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityComponent {
    /// Player, NPC, or monster.
    pub actor: ActorKind,
    /// Stable id known to storage (account character id, spawn id).
    pub id: String,
    /// Runtime entity id.
    pub uuid: Uuid,
}

impl IdentityComponent {
    /// Identity for `entity`.
    pub fn new(actor: ActorKind, id: impl Into<String>, entity: EntityId) -> Self {
        Self {
            actor,
            id: id.into(),
            uuid: entity.0,
        }
    }
}

/// How an entity reaches clients.
#[derive(Debug, Clone)]
pub struct NetworkingComponent {
    /// Outbound channel.
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Movement channel, e.g. `player:movement`.
    pub channel: String,
    /// Broadcast on the next pass even if the signature did not advance.
    pub force_broadcast: bool,
}

impl NetworkingComponent {
    /// Networking on the actor's movement channel.
    pub fn new(actor: ActorKind, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster,
            channel: actor.channel("movement"),
            force_broadcast: false,
        }
    }
}

/// Marks state that changed since the last save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleComponent {
    /// Set on every persisted change.
    pub dirty: bool,
    /// When the flag was last set.
    pub last_dirty_at: Option<u64>,
}

/// Default minimum spacing between two saves of one entity.
pub const DEFAULT_SAVE_COOLDOWN_MS: u64 = 5_000;

/// Save hook plus per-entity throttle.
#[derive(Debug, Clone)]
pub struct PersistenceComponent {
    /// Changed since the last dispatched save.
    pub dirty: bool,
    /// Minimum spacing between saves.
    pub cooldown_ms: u64,
    /// When the last save was dispatched.
    pub last_save_at: Option<u64>,
    /// Called with a snapshot for each save.
    pub hook: Arc<dyn SaveHook>,
    /// Clear dirty flags as soon as a save is dispatched.
    pub auto_clear_dirty: bool,
}

impl PersistenceComponent {
    /// Persistence through `hook` with the default cooldown.
    pub fn new(hook: Arc<dyn SaveHook>) -> Self {
        Self {
            dirty: false,
            cooldown_ms: DEFAULT_SAVE_COOLDOWN_MS,
            last_save_at: None,
            hook,
            auto_clear_dirty: true,
        }
    }

    /// Builder: set the save cooldown.
    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }
}

// ---------------------------------------------------------------------------
// Monsters & NPCs
// ---------------------------------------------------------------------------

/// Tuning for AI-driven actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourComponent {
    /// Acquire new targets within this many tiles.
    pub aggression_range: u32,
    /// Keep chasing an acquired target within this many tiles.
    pub pursuit_range: u32,
    /// Minimum spacing between attacks.
    pub attack_interval_ms: u64,
    /// Delay from commit to hit.
    pub windup_ms: u64,
    /// Scales rolled damage.
    pub damage_multiplier: f64,
    /// Random-walk cadence while idle. `None` stands still.
    pub random_walk_interval_ms: Option<u64>,
}

impl Default for BehaviourComponent {
    fn default() -> Self {
        Self {
            aggression_range: 4,
            pursuit_range: 8,
            attack_interval_ms: 1_200,
            windup_ms: 400,
            damage_multiplier: 1.0,
            random_walk_interval_ms: Some(3_000),
        }
    }
}

/// Monster rarity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// No bonus.
    #[default]
    Normal,
    /// Slightly stronger.
    Magic,
    /// Much stronger.
    Rare,
    /// One of a kind.
    Unique,
}

impl Rarity {
    /// Damage scale for this tier.
    pub fn damage_multiplier(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Magic => 1.25,
            Self::Rare => 1.5,
            Self::Unique => 2.0,
        }
    }
}

/// Inclusive base damage range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRange {
    /// Lowest roll.
    pub min: u32,
    /// Highest roll.
    pub max: u32,
}

impl DamageRange {
    /// A range with `min <= max` guaranteed.
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

/// Monster content and spawn data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterComponent {
    /// Archetype content id.
    pub archetype: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Base damage roll.
    pub damage: DamageRange,
    /// Spawn tile, also the leash anchor.
    pub spawn: TilePos,
}

/// Monster combat state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatMode {
    /// No target.
    #[default]
    Idle,
    /// Closing in on a target.
    Pursuing,
    /// Winding up an attack.
    Attacking,
}

impl fmt::Display for CombatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pursuing => write!(f, "pursuing"),
            Self::Attacking => write!(f, "attacking"),
        }
    }
}

/// A committed attack waiting for its windup to elapse. `resolve_at`
/// doubles as the generation token for the scheduled resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    /// Who will be hit.
    pub target: EntityId,
    /// When the hit lands.
    pub resolve_at: u64,
    /// Damage rolled at commit time.
    pub damage: u32,
}

/// Monster combat controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonsterCombatComponent {
    /// Current state machine mode.
    pub mode: CombatMode,
    /// Current target.
    pub target: Option<EntityId>,
    /// At most one committed attack.
    pub pending_attack: Option<PendingAttack>,
    /// When the last attack was committed.
    pub last_attack_at: Option<u64>,
    /// When the last idle wander was queued.
    pub last_wander_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// An accepted skill input, kept for combo detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInput {
    /// Content id.
    pub skill_id: String,
    /// Player combat sequence at acceptance.
    pub sequence: u64,
    /// Acceptance time.
    pub at: u64,
    /// Client payload.
    #[serde(default)]
    pub data: Value,
}

/// Player skill inputs and global cooldown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCombatComponent {
    /// Accepted inputs so far.
    pub sequence: u64,
    /// No input is accepted before this time.
    pub global_cooldown_until: u64,
    /// Recent inputs inside the combo window.
    pub history: VecDeque<SkillInput>,
}

/// Player animation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    /// Standing.
    #[default]
    Idle,
    /// Playing an attack clip.
    Attack,
    /// Holding the last attack frame.
    Hold,
}

/// Animation state machine. `sequence` is the generation token checked by
/// the scheduled auto-revert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationComponent {
    /// Current state.
    pub state: AnimationState,
    /// Clip name while attacking.
    pub clip: Option<String>,
    /// Bumped on every transition.
    pub sequence: u64,
    /// When the hold reverts to idle.
    pub hold_until: Option<u64>,
}

/// A multi-tile walk fed to the movement system one step at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathWalkComponent {
    /// Generation token. Bumped on every new walk or cancellation.
    pub walk_id: u64,
    /// Directions still to walk.
    pub steps: VecDeque<Direction>,
    /// Where the walk ends.
    pub destination: Option<TilePos>,
    /// Actions the player queued while walking, run once the walk ends.
    pub queued_after: VecDeque<Action>,
}

impl PathWalkComponent {
    /// A walk is in progress.
    pub fn is_walking(&self) -> bool {
        self.destination.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::GridMover;

    #[test]
    fn presence_is_tag_based() {
        let mut set = ComponentSet::default();
        assert!(!set.has(ComponentKind::Transform));
        set.insert(TransformComponent::at(TilePos::new(1, 2)).into());
        set.insert(MovementStateComponent::new(Arc::new(GridMover::new())).into());
        assert!(set.has(ComponentKind::Transform));
        assert!(set.has(ComponentKind::MovementState));
        assert_eq!(
            set.kinds(),
            vec![ComponentKind::Transform, ComponentKind::MovementState]
        );

        let removed = set.remove(ComponentKind::Transform).unwrap();
        assert_eq!(removed.kind(), ComponentKind::Transform);
        assert!(!set.has(ComponentKind::Transform));
        assert!(set.remove(ComponentKind::Transform).is_none());
    }

    #[test]
    fn signature_orders_by_sequence_first() {
        let older = MovementSignature {
            sequence: 3,
            started_at: 900,
            direction: Some(Direction::West),
        };
        let newer = MovementSignature {
            sequence: 4,
            started_at: 100,
            direction: Some(Direction::North),
        };
        assert!(newer > older);
    }

    #[test]
    fn step_finished_after_duration() {
        let step = MovementStep {
            sequence: 1,
            started_at: 100,
            duration_ms: 150,
            direction: Some(Direction::East),
            blocked: false,
        };
        assert!(!step.is_finished(200));
        assert!(step.is_finished(250));
        assert!(MovementStep::default().is_finished(0));
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let action = Action::Move(MoveIntent::new(Direction::East));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["direction"], "east");
        assert_eq!(action.kind(), ActionKind::Move);
    }

    #[test]
    fn damage_range_orders_bounds() {
        let range = DamageRange::new(9, 3);
        assert_eq!(range.min, 3);
        assert_eq!(range.max, 9);
        assert!((Rarity::Rare.damage_multiplier() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn networking_channel_follows_actor() {
        let net = NetworkingComponent::new(
            ActorKind::Npc,
            Arc::new(crate::net::RecordingBroadcaster::new()),
        );
        assert_eq!(net.channel, "npc:movement");
        assert!(!net.force_broadcast);
    }
}
