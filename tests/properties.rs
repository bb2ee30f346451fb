mod common;

use common::CreatureBuilder;
use evolarium_lib::model::brain::{Action, Heading, RandomPolicy};
use evolarium_lib::model::config::{AppConfig, OffspringRule};
use evolarium_lib::model::creature::Creature;
use evolarium_lib::model::data::{CreatureColor, Season};
use evolarium_lib::model::systems::feeding::{resolve_predation, FeedingReport};
use evolarium_lib::model::systems::lifecycle::{apply_action, step_creature};
use evolarium_lib::model::systems::reproduction::{
    mutation_probability, reproduce, ColorCensus, MutationWindow,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn arb_color() -> impl Strategy<Value = CreatureColor> {
    prop_oneof![
        Just(CreatureColor::Red),
        Just(CreatureColor::Blue),
        Just(CreatureColor::Yellow),
        Just(CreatureColor::Green),
        (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(r, g, b)| CreatureColor::Rgb(r, g, b)),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Thrust(Heading::North)),
        Just(Action::Thrust(Heading::East)),
        Just(Action::Thrust(Heading::South)),
        Just(Action::Thrust(Heading::West)),
    ]
}

fn spawn(
    config: &AppConfig,
    x: f64,
    y: f64,
    size: f64,
    color: CreatureColor,
) -> Creature<RandomPolicy> {
    CreatureBuilder::new()
        .at(x, y)
        .size(size)
        .color(color)
        .build(config)
}

proptest! {
    #[test]
    fn size_never_drops_below_floor(
        start in 5.0f64..60.0,
        shrink in prop::collection::vec(0.0f64..30.0, 1..20),
    ) {
        let config = AppConfig::default();
        let mut creature = spawn(&config, 900.0, 400.0, start, CreatureColor::Red);
        for delta in shrink {
            creature.set_size(creature.size - delta);
            prop_assert!(creature.size >= creature.min_size);
        }
    }

    #[test]
    fn stepping_keeps_size_and_bounds(
        actions in prop::collection::vec(arb_action(), 1..300),
        x in 0.0f64..1900.0,
        y in 0.0f64..800.0,
    ) {
        let mut config = AppConfig::default();
        config.creature.hunger_threshold = 5;
        let mut creature = spawn(&config, x, y, 11.0, CreatureColor::Blue);
        for action in &actions {
            apply_action(&mut creature, action, &config);
            step_creature(&mut creature, &config);
            prop_assert!(creature.size >= config.creature.min_size);
            prop_assert!((0.0..=config.world.width).contains(&creature.pos.x));
            prop_assert!((0.0..=config.world.height).contains(&creature.pos.y));
            if !creature.is_alive() {
                break;
            }
        }
        if creature.size <= config.creature.min_size {
            prop_assert!(!creature.is_alive());
        }
    }

    #[test]
    fn predation_needs_bigger_size_and_other_color(
        hunter_size in 5.0f64..40.0,
        prey_size in 5.0f64..40.0,
        hunter_color in arb_color(),
        prey_color in arb_color(),
        gap in 0.0f64..50.0,
    ) {
        let config = AppConfig::default();
        let mut creatures = vec![
            spawn(&config, 500.0, 400.0, hunter_size, hunter_color),
            spawn(&config, 500.0 + gap, 400.0, prey_size, prey_color),
        ];
        let dist = creatures[0].pos.dist(&creatures[1].pos);
        let mut report = FeedingReport::default();
        resolve_predation(&mut creatures, &config.food, &mut report);

        let bigger = hunter_size > prey_size;
        let smaller = prey_size > hunter_size;
        let different = hunter_color != prey_color;
        let hunter_kills = bigger && different && dist < hunter_size;
        let prey_kills = smaller && different && dist < prey_size;

        prop_assert_eq!(report.kills, usize::from(hunter_kills || prey_kills));
        prop_assert_eq!(creatures[1].is_alive(), !hunter_kills);
        prop_assert_eq!(creatures[0].is_alive(), !prey_kills);
        if !different || (hunter_size - prey_size).abs() < f64::EPSILON {
            prop_assert_eq!(report.kills, 0);
        }
    }

    #[test]
    fn reproduction_conserves_biomass_bound(
        size in 37.5f64..120.0,
        season in prop_oneof![
            Just(Season::Spring),
            Just(Season::Summer),
            Just(Season::Autumn),
            Just(Season::Winter),
        ],
        fixed in prop::option::of(1u32..6),
        seed in any::<u64>(),
    ) {
        let mut config = AppConfig::default();
        if let Some(n) = fixed {
            config.reproduction.offspring = OffspringRule::Fixed(n);
        }
        let mut creatures = vec![spawn(&config, 900.0, 400.0, size, CreatureColor::Green)];
        let census = ColorCensus::from_creatures(&creatures);
        let mut births = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let parents = reproduce(
            &mut creatures,
            &mut births,
            &census,
            &mut MutationWindow::default(),
            season,
            &config,
            &mut rng,
        );

        prop_assert_eq!(parents, 1);
        prop_assert!(!births.is_empty());
        let children: f64 = births.iter().map(|c| c.size).sum();
        prop_assert!(children <= size * config.reproduction.child_size_fraction + 1e-9);
        prop_assert!((creatures[0].size - size / 3.0).abs() < 1e-9);
        for child in &births {
            prop_assert_eq!(child.generation, 1);
            prop_assert!(child.size >= child.min_size);
        }
    }

    #[test]
    fn mutation_probability_is_monotone_and_capped(a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let config = AppConfig::default();
        let k = config.reproduction.color_mutation_k;
        let cap = config.reproduction.color_mutation_cap;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let p_lo = mutation_probability(lo, k, cap);
        let p_hi = mutation_probability(hi, k, cap);
        prop_assert!(p_lo <= p_hi);
        prop_assert!((0.0..=0.9).contains(&p_hi));
    }
}

#[test]
fn immature_creature_does_not_split() {
    let config = AppConfig::default();
    let mut creatures = vec![spawn(&config, 900.0, 400.0, 37.4, CreatureColor::Red)];
    let census = ColorCensus::from_creatures(&creatures);
    let mut births = Vec::new();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let parents = reproduce(
        &mut creatures,
        &mut births,
        &census,
        &mut MutationWindow::default(),
        Season::Spring,
        &config,
        &mut rng,
    );
    assert_eq!(parents, 0);
    assert!(births.is_empty());
    assert_eq!(creatures[0].size, 37.4);
}
