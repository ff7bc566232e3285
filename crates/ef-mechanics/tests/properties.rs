//! Property tests for the invariants that must hold for every input:
//! - health stays within `0..=max` under any damage/healing sequence
//! - every damage roll is at least 1
//! - an attack is never committed while another is pending

use ef_core::component::{DamageRange, Rarity};
use ef_core::stats::{Attributes, LifeState};
use ef_mechanics::combat::damage::{self, DamageProfile, DamageScaling};
use ef_mechanics::stats::{
    DamageOptions, LifecycleTuning, RespawnOptions, apply_damage, apply_healing, initialise,
    try_respawn,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
enum Op {
    Damage(u32, bool),
    Heal(u32),
    Respawn(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..200, any::<bool>()).prop_map(|(n, cheat)| Op::Damage(n, cheat)),
        (0u32..200).prop_map(Op::Heal),
        any::<bool>().prop_map(Op::Respawn),
    ]
}

fn rarity() -> impl Strategy<Value = Rarity> {
    prop_oneof![
        Just(Rarity::Normal),
        Just(Rarity::Magic),
        Just(Rarity::Rare),
        Just(Rarity::Unique),
    ]
}

// ============================================================
// Lifecycle
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_health_stays_clamped(
        vitality in -10i32..40,
        level in 1u32..20,
        charges in 0u32..3,
        ops in proptest::collection::vec(op(), 1..40),
    ) {
        let tuning = LifecycleTuning::default();
        let mut stats = initialise(level, Attributes::new(0, 0, 0, vitality), &tuning);
        stats.life.cheat_death_charges = charges;

        for op in ops {
            match op {
                Op::Damage(n, allow) => {
                    let options = DamageOptions {
                        allow_cheat_death: allow,
                    };
                    apply_damage(&mut stats, n, options, &tuning);
                }
                Op::Heal(n) => {
                    apply_healing(&mut stats, n);
                }
                Op::Respawn(force) => {
                    try_respawn(&mut stats, RespawnOptions { force }, &tuning);
                }
            }
            prop_assert!(stats.health.current <= stats.health.max);
            // Zero health only ever goes with a dead state.
            if stats.health.current == 0 {
                prop_assert!(!stats.life.state.is_alive());
            }
            if stats.life.state == LifeState::Alive {
                prop_assert!(stats.health.current > 0);
            }
        }
    }

    #[test]
    fn prop_cheat_death_spends_exactly_one_charge(charges in 1u32..5, overkill in 0u32..500) {
        let tuning = LifecycleTuning::default();
        let mut stats = initialise(1, Attributes::default(), &tuning);
        stats.life.cheat_death_charges = charges;
        let lethal = stats.health.current + overkill;

        apply_damage(&mut stats, lethal, DamageOptions::default(), &tuning);
        prop_assert_eq!(stats.life.cheat_death_charges, charges - 1);
        prop_assert_eq!(stats.life.state, LifeState::CheatDeath);
        prop_assert!(stats.health.current >= 1);
    }
}

// ============================================================
// Damage
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_damage_is_at_least_one(
        seed in any::<u64>(),
        a in 0u32..50,
        b in 0u32..50,
        strength in -100i32..100,
        dexterity in -100i32..100,
        intelligence in -100i32..100,
        multiplier in -2.0f64..4.0,
        rarity in rarity(),
    ) {
        let attributes = Attributes::new(strength, dexterity, intelligence, 0);
        let scaling = DamageScaling::default();
        let profile = DamageProfile {
            range: DamageRange::new(a, b),
            attributes: &attributes,
            scaling: &scaling,
            multiplier,
            rarity,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        prop_assert!(damage::roll(&profile, &mut rng) >= 1);
    }
}
