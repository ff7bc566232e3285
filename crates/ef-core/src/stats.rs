//! Attribute and resource data carried by the `stats` component.
//!
//! Only the data and its clamping invariants live here. The lifecycle
//! pipeline that moves an entity between life states is in `ef-mechanics`.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// The four primary attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Physical power.
    Strength,
    /// Agility.
    Dexterity,
    /// Magical power.
    Intelligence,
    /// Toughness.
    Vitality,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strength => write!(f, "strength"),
            Self::Dexterity => write!(f, "dexterity"),
            Self::Intelligence => write!(f, "intelligence"),
            Self::Vitality => write!(f, "vitality"),
        }
    }
}

/// One value per attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Strength value.
    pub strength: i32,
    /// Dexterity value.
    pub dexterity: i32,
    /// Intelligence value.
    pub intelligence: i32,
    /// Vitality value.
    pub vitality: i32,
}

impl Attributes {
    /// All four values in declaration order.
    pub const fn new(strength: i32, dexterity: i32, intelligence: i32, vitality: i32) -> Self {
        Self {
            strength,
            dexterity,
            intelligence,
            vitality,
        }
    }

    /// Value of one attribute.
    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Intelligence => self.intelligence,
            Attribute::Vitality => self.vitality,
        }
    }

    /// Overwrite one attribute.
    pub fn set(&mut self, attribute: Attribute, value: i32) {
        match attribute {
            Attribute::Strength => self.strength = value,
            Attribute::Dexterity => self.dexterity = value,
            Attribute::Intelligence => self.intelligence = value,
            Attribute::Vitality => self.vitality = value,
        }
    }
}

impl Add for Attributes {
    type Output = Attributes;

    fn add(self, rhs: Attributes) -> Attributes {
        Attributes {
            strength: self.strength + rhs.strength,
            dexterity: self.dexterity + rhs.dexterity,
            intelligence: self.intelligence + rhs.intelligence,
            vitality: self.vitality + rhs.vitality,
        }
    }
}

/// Attribute contributions by source. `total` is always their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSources {
    /// Unmodified character attributes.
    pub base: Attributes,
    /// Worn gear.
    pub equipment: Attributes,
    /// Temporary buffs.
    pub bonuses: Attributes,
    /// Always-on skill effects.
    pub passives: Attributes,
    /// Sum of the four sources.
    pub total: Attributes,
}

impl AttributeSources {
    /// Sources with only a base contribution, total already summed.
    pub fn from_base(base: Attributes) -> Self {
        let mut sources = Self {
            base,
            ..Default::default()
        };
        sources.recompute();
        sources
    }

    /// Re-sum `total` from the four sources.
    pub fn recompute(&mut self) -> Attributes {
        self.total = self.base + self.equipment + self.bonuses + self.passives;
        self.total
    }
}

/// A clamped pool such as health or mana.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Current value, never above `max`.
    pub current: u32,
    /// Upper bound.
    pub max: u32,
}

impl ResourcePool {
    /// A full pool.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Add `amount`, clamped at `max`. Returns the amount actually gained.
    pub fn restore(&mut self, amount: u32) -> u32 {
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.max);
        self.current - before
    }

    /// Remove `amount`, clamped at zero. Returns the amount actually lost.
    ///
    /// Health must go through the lifecycle pipeline; this is the raw
    /// clamp it builds on.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let before = self.current;
        self.current = self.current.saturating_sub(amount);
        before - self.current
    }

    /// Change the maximum, keeping `current` inside the new bound.
    pub fn set_max(&mut self, max: u32) {
        self.max = max;
        self.current = self.current.min(max);
    }

    /// Set `current` directly, clamped to `max`.
    pub fn set_current(&mut self, value: u32) {
        self.current = value.min(self.max);
    }

    /// Whether the pool is drained.
    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Filled fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        f64::from(self.current) / f64::from(self.max)
    }
}

impl fmt::Display for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}

/// Where a character is in the life/death/respawn cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifeState {
    /// Standing in the world.
    #[default]
    Alive,
    /// Dead, waiting for a respawn.
    AwaitingRespawn,
    /// Survived a killing blow on a charge.
    CheatDeath,
    /// Dead for good.
    Permadead,
}

impl LifeState {
    /// Alive and cheat-death both count as standing in the world.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Alive | Self::CheatDeath)
    }
}

impl fmt::Display for LifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "alive"),
            Self::AwaitingRespawn => write!(f, "awaiting-respawn"),
            Self::CheatDeath => write!(f, "cheat-death"),
            Self::Permadead => write!(f, "permadead"),
        }
    }
}

/// Soft characters always respawn; hard characters spend lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleMode {
    /// Respawns never run out.
    #[default]
    Soft,
    /// Each death spends a life.
    Hard,
}

/// The life sub-state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeRecord {
    /// Current state.
    pub state: LifeState,
    /// Killing blows that can still be survived.
    pub cheat_death_charges: u32,
    /// Respawns left in hard mode.
    pub lives_remaining: u32,
    /// Soft or hard lifecycle.
    pub mode: LifecycleMode,
}

impl Default for LifeRecord {
    fn default() -> Self {
        Self {
            state: LifeState::Alive,
            cheat_death_charges: 0,
            lives_remaining: 1,
            mode: LifecycleMode::Soft,
        }
    }
}

/// The `stats` component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsComponent {
    /// Character level.
    pub level: u32,
    /// Attribute contributions.
    pub attributes: AttributeSources,
    /// Health pool.
    pub health: ResourcePool,
    /// Mana pool.
    pub mana: ResourcePool,
    /// Life sub-state.
    pub life: LifeRecord,
}

impl StatsComponent {
    /// Stats with the given level and base attributes. Pools start empty
    /// until the mechanics crate derives their maxima.
    pub fn new(level: u32, base: Attributes) -> Self {
        Self {
            level: level.max(1),
            attributes: AttributeSources::from_base(base),
            health: ResourcePool::full(0),
            mana: ResourcePool::full(0),
            life: LifeRecord::default(),
        }
    }

    /// Effective attribute value.
    pub fn total(&self) -> Attributes {
        self.attributes.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_all_sources() {
        let mut sources = AttributeSources::from_base(Attributes::new(5, 4, 3, 2));
        sources.equipment.strength = 2;
        sources.bonuses.vitality = 3;
        sources.passives.intelligence = 1;
        let total = sources.recompute();
        assert_eq!(total, Attributes::new(7, 4, 4, 5));
        assert_eq!(sources.total.get(Attribute::Vitality), 5);
    }

    #[test]
    fn pool_restore_clamps_at_max() {
        let mut pool = ResourcePool { current: 8, max: 10 };
        assert_eq!(pool.restore(5), 2);
        assert_eq!(pool.current, 10);
    }

    #[test]
    fn pool_drain_clamps_at_zero() {
        let mut pool = ResourcePool::full(10);
        assert_eq!(pool.drain(25), 10);
        assert!(pool.is_empty());
    }

    #[test]
    fn shrinking_max_clamps_current() {
        let mut pool = ResourcePool::full(40);
        pool.set_max(25);
        assert_eq!(pool.current, 25);
        assert!((pool.fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cheat_death_counts_as_alive() {
        assert!(LifeState::CheatDeath.is_alive());
        assert!(!LifeState::AwaitingRespawn.is_alive());
        assert_eq!(LifeState::AwaitingRespawn.to_string(), "awaiting-respawn");
    }
}
