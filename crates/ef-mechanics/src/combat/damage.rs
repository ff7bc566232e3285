//! Monster damage rolls.

use ef_core::component::{DamageRange, Rarity};
use ef_core::stats::Attributes;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Per-attribute damage coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageScaling {
    /// Damage per point of strength.
    pub strength: f64,
    /// Damage per point of dexterity.
    pub dexterity: f64,
    /// Damage per point of intelligence.
    pub intelligence: f64,
}

impl Default for DamageScaling {
    fn default() -> Self {
        Self {
            strength: 0.6,
            dexterity: 0.3,
            intelligence: 0.2,
        }
    }
}

impl DamageScaling {
    /// Flat bonus contributed by attribute totals.
    pub fn bonus(&self, totals: &Attributes) -> f64 {
        self.strength * f64::from(totals.strength)
            + self.dexterity * f64::from(totals.dexterity)
            + self.intelligence * f64::from(totals.intelligence)
    }
}

/// Inputs to a damage roll other than the random base.
#[derive(Debug, Clone, Copy)]
pub struct DamageProfile<'a> {
    /// Archetype base range.
    pub range: DamageRange,
    /// Attacker attribute totals.
    pub attributes: &'a Attributes,
    /// Attribute coefficients.
    pub scaling: &'a DamageScaling,
    /// The attacker's behaviour multiplier.
    pub multiplier: f64,
    /// The attacker's rarity.
    pub rarity: Rarity,
}

/// Scale a rolled base into final damage: floored, never below 1.
pub fn scale(base: u32, profile: &DamageProfile<'_>) -> u32 {
    let raw = (f64::from(base) + profile.scaling.bonus(profile.attributes))
        * profile.multiplier
        * profile.rarity.damage_multiplier();
    if raw.is_nan() || raw < 1.0 {
        return 1;
    }
    raw.floor().min(f64::from(u32::MAX)) as u32
}

/// Roll a base from the profile's range and scale it.
pub fn roll(profile: &DamageProfile<'_>, rng: &mut StdRng) -> u32 {
    let base = rng.random_range(profile.range.min..=profile.range.max);
    scale(base, profile)
}
