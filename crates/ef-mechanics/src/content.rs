//! Read-only lookup of static game content.
//!
//! The content tables themselves are authored elsewhere; this module only
//! defines the shapes the simulation reads and a JSON-backed table.

use std::collections::HashMap;

use ef_core::component::{BehaviourComponent, DamageRange, MonsterComponent, Rarity};
use ef_core::grid::TilePos;
use ef_core::stats::{Attributes, StatsComponent};
use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};
use crate::stats::{LifecycleTuning, initialise};

/// A monster template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterArchetype {
    /// Content id, e.g. `"harbor-rat"`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Character level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Base attributes before any bonuses.
    #[serde(default)]
    pub attributes: Attributes,
    /// Base damage range rolled on each attack.
    pub damage: DamageRange,
    /// AI tuning.
    #[serde(default)]
    pub behaviour: BehaviourComponent,
    /// Manhattan leash around the spawn point.
    #[serde(default = "default_leash")]
    pub leash_radius: u32,
}

fn default_level() -> u32 {
    1
}

fn default_leash() -> u32 {
    6
}

/// The components a spawned monster of one archetype starts with.
#[derive(Debug, Clone)]
pub struct MonsterLoadout {
    /// Archetype reference, rarity, damage, spawn point.
    pub monster: MonsterComponent,
    /// AI tuning copied from the archetype.
    pub behaviour: BehaviourComponent,
    /// Stats with full pools.
    pub stats: StatsComponent,
}

impl MonsterArchetype {
    /// Build the starting components for a monster spawned at `spawn`.
    pub fn loadout(
        &self,
        spawn: TilePos,
        rarity: Rarity,
        tuning: &LifecycleTuning,
    ) -> MonsterLoadout {
        MonsterLoadout {
            monster: MonsterComponent {
                archetype: self.id.clone(),
                rarity,
                damage: self.damage,
                spawn,
            },
            behaviour: self.behaviour.clone(),
            stats: initialise(self.level, self.attributes, tuning),
        }
    }
}

/// A skill definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Content id, e.g. `"slash"`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Attack clip length, overriding the default tuning.
    #[serde(default)]
    pub animation_ms: Option<u64>,
    /// Whether the skill needs a target entity.
    #[serde(default)]
    pub requires_target: bool,
}

/// Read-only content access.
pub trait ContentLookup: Send + Sync {
    /// A monster archetype by id.
    fn monster(&self, id: &str) -> Option<&MonsterArchetype>;

    /// A skill by id.
    fn skill(&self, id: &str) -> Option<&SkillDefinition>;

    /// Like [`ContentLookup::monster`] but reports a missing id.
    fn require_monster(&self, id: &str) -> MechResult<&MonsterArchetype> {
        self.monster(id)
            .ok_or_else(|| MechError::UnknownArchetype(id.to_string()))
    }

    /// Like [`ContentLookup::skill`] but reports a missing id.
    fn require_skill(&self, id: &str) -> MechResult<&SkillDefinition> {
        self.skill(id)
            .ok_or_else(|| MechError::UnknownSkill(id.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContentFile {
    #[serde(default)]
    monsters: Vec<MonsterArchetype>,
    #[serde(default)]
    skills: Vec<SkillDefinition>,
}

/// In-memory content keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ContentTable {
    monsters: HashMap<String, MonsterArchetype>,
    skills: HashMap<String, SkillDefinition>,
}

impl ContentTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"monsters": [...], "skills": [...]}`.
    pub fn from_json(text: &str) -> MechResult<Self> {
        let file: ContentFile = serde_json::from_str(text)?;
        let mut table = Self::new();
        for monster in file.monsters {
            table.add_monster(monster);
        }
        for skill in file.skills {
            table.add_skill(skill);
        }
        tracing::debug!(
            monsters = table.monsters.len(),
            skills = table.skills.len(),
            "content loaded"
        );
        Ok(table)
    }

    /// Insert or replace a monster archetype.
    pub fn add_monster(&mut self, archetype: MonsterArchetype) {
        self.monsters.insert(archetype.id.clone(), archetype);
    }

    /// Insert or replace a skill.
    pub fn add_skill(&mut self, skill: SkillDefinition) {
        self.skills.insert(skill.id.clone(), skill);
    }
}

impl ContentLookup for ContentTable {
    fn monster(&self, id: &str) -> Option<&MonsterArchetype> {
        self.monsters.get(id)
    }

    fn skill(&self, id: &str) -> Option<&SkillDefinition> {
        self.skills.get(id)
    }
}
