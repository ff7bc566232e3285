//! Derived resource maxima.
//!
//! Every resource pool is a linear function of level and one attribute
//! total: `base + per_level * (level - 1) + per_attribute * total`.

use ef_core::stats::{Attribute, Attributes, StatsComponent};
use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};

/// One linear resource formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFormula {
    /// Value at level 1 with zero in the scaling attribute.
    pub base: u32,
    /// Gained per level above the first.
    pub per_level: u32,
    /// Gained per point of `attribute` total.
    pub per_attribute: u32,
    /// The attribute this resource scales with.
    pub attribute: Attribute,
}

impl ResourceFormula {
    /// `50 + 10 * (level - 1) + 5 * VIT`
    pub const HEALTH: Self = Self {
        base: 50,
        per_level: 10,
        per_attribute: 5,
        attribute: Attribute::Vitality,
    };

    /// `20 + 5 * (level - 1) + 4 * INT`
    pub const MANA: Self = Self {
        base: 20,
        per_level: 5,
        per_attribute: 4,
        attribute: Attribute::Intelligence,
    };

    /// Evaluate for a level and attribute totals. Negative totals count as
    /// zero so debuffs can never push a maximum below the base.
    pub fn evaluate(&self, level: u32, totals: &Attributes) -> u32 {
        let levels = level.max(1) - 1;
        let points = totals.get(self.attribute).max(0) as u32;
        self.base
            .saturating_add(self.per_level.saturating_mul(levels))
            .saturating_add(self.per_attribute.saturating_mul(points))
    }
}

/// Tuning for the stats and lifecycle pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleTuning {
    /// Formula for maximum health.
    pub health: ResourceFormula,
    /// Formula for maximum mana.
    pub mana: ResourceFormula,
    /// Fraction of maximum health restored on respawn.
    pub respawn_fraction: f64,
    /// Health a cheat-death leaves the character with.
    pub cheat_death_floor: u32,
}

impl Default for LifecycleTuning {
    fn default() -> Self {
        Self {
            health: ResourceFormula::HEALTH,
            mana: ResourceFormula::MANA,
            respawn_fraction: 0.5,
            cheat_death_floor: 1,
        }
    }
}

impl LifecycleTuning {
    /// Set the respawn fraction.
    pub fn with_respawn_fraction(mut self, fraction: f64) -> Self {
        self.respawn_fraction = fraction;
        self
    }

    /// Set the cheat-death floor.
    pub fn with_cheat_death_floor(mut self, floor: u32) -> Self {
        self.cheat_death_floor = floor;
        self
    }

    /// Check the values a host may have loaded from a file.
    pub fn validate(&self) -> MechResult<()> {
        if !(self.respawn_fraction > 0.0 && self.respawn_fraction <= 1.0) {
            return Err(MechError::InvalidTuning(format!(
                "respawn_fraction must be in (0, 1], got {}",
                self.respawn_fraction
            )));
        }
        if self.cheat_death_floor == 0 {
            return Err(MechError::InvalidTuning(
                "cheat_death_floor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Re-sum attribute totals and re-derive pool maxima. Current values are
/// clamped into the new maxima, never raised.
pub fn recalculate(stats: &mut StatsComponent, tuning: &LifecycleTuning) {
    let totals = stats.attributes.recompute();
    stats.health.set_max(tuning.health.evaluate(stats.level, &totals));
    stats.mana.set_max(tuning.mana.evaluate(stats.level, &totals));
}

/// Build stats for a fresh character: maxima derived and both pools full.
pub fn initialise(level: u32, base: Attributes, tuning: &LifecycleTuning) -> StatsComponent {
    let mut stats = StatsComponent::new(level, base);
    recalculate(&mut stats, tuning);
    stats.health.current = stats.health.max;
    stats.mana.current = stats.mana.max;
    stats
}
