mod common;

use common::{CreatureBuilder, WorldBuilder};
use evolarium_lib::headless::{self, RunOptions};
use evolarium_lib::model::brain::RandomPolicy;
use evolarium_lib::model::config::{AppConfig, PolicyKind};
use evolarium_lib::model::data::{CreatureColor, FoodKind, Season};
use evolarium_lib::model::history::LiveEvent;
use evolarium_lib::model::world::World;
use std::collections::HashSet;
use uuid::Uuid;

fn seeded_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.world.seed = Some(seed);
    config.world.deterministic = true;
    config
}

/// Population after every tick of the first epoch, plus the tick it ended on.
fn first_epoch_trace(seed: u64, ticks: u64) -> (Vec<usize>, Option<u64>, String) {
    let mut world = World::<RandomPolicy>::new(seeded_config(seed)).unwrap();
    let mut trace = vec![world.population()];
    let mut extinct_at = None;
    for _ in 0..ticks {
        world.update().unwrap();
        if world.last_report.epoch_reset {
            extinct_at = Some(world.tick);
            break;
        }
        trace.push(world.population());
    }
    (trace, extinct_at, world.deterministic_hash())
}

#[test]
fn test_random_population_declines_and_is_reproducible() {
    for seed in [1, 2, 3, 99, 2024] {
        let (trace, extinct_at, hash) = first_epoch_trace(seed, 1000);
        assert_eq!(trace[0], 20);
        let last = trace.last().copied().unwrap_or(0);
        assert!(last < 20, "seed {seed}: population did not decline ({last})");
        assert!(
            trace.iter().all(|&p| p <= 20),
            "seed {seed}: population grew past its starting count"
        );

        let (replay, replay_extinct_at, replay_hash) = first_epoch_trace(seed, 1000);
        assert_eq!(trace, replay);
        assert_eq!(extinct_at, replay_extinct_at);
        assert_eq!(hash, replay_hash);
    }
}

#[test]
fn test_headless_runs_match_for_same_seed() {
    let options = RunOptions {
        ticks: 300,
        stop_on_extinction: false,
    };
    let mut config = seeded_config(77);
    config.policy.kind = PolicyKind::Random;
    let a = headless::run_config(config.clone(), options).unwrap();
    let b = headless::run_config(config, options).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.ticks, 300);
}

#[test]
fn test_growth_food_scenario() {
    let id = Uuid::new_v4();
    let mut world = WorldBuilder::new()
        .without_respawn()
        .with_food(505.0, 400.0, FoodKind::Growth)
        .with_creature(CreatureBuilder::new().id(id).at(500.0, 400.0).size(20.0))
        .build();
    assert_eq!(world.food_count(), 1);

    world.update().unwrap();

    let creature = world.find_creature(id).unwrap();
    assert_eq!(creature.size, 24.0);
    assert_eq!(creature.food_eaten, 1);
    assert!((creature.energy - 300.0).abs() < 0.5);
    assert_eq!(world.food_count(), 0);
    assert_eq!(world.last_report.foods_eaten, 1);
}

#[test]
fn test_spring_split_scenario() {
    let parent = Uuid::new_v4();
    let mut world = WorldBuilder::new()
        .without_respawn()
        .with_creature(CreatureBuilder::new().id(parent).size(37.5))
        .build();
    assert_eq!(world.season(), Season::Spring);

    world.update().unwrap();

    assert_population!(world, 6);
    assert_eq!(world.last_report.births, 5);
    assert_eq!(world.find_creature(parent).unwrap().size, 12.5);
    let children: Vec<_> = world
        .creatures
        .iter()
        .filter(|c| c.parent_id == Some(parent))
        .collect();
    assert_eq!(children.len(), 5);
    for child in children {
        assert!((child.size - 6.75).abs() < 1e-9);
        assert_eq!(child.generation, 1);
    }
}

#[test]
fn test_predation_across_colors_only() {
    let hunter = Uuid::new_v4();
    let prey = Uuid::new_v4();
    let kin = Uuid::new_v4();
    let mut world = WorldBuilder::new()
        .without_respawn()
        .with_creature(
            CreatureBuilder::new()
                .id(hunter)
                .at(500.0, 400.0)
                .size(30.0)
                .color(CreatureColor::Red),
        )
        .with_creature(
            CreatureBuilder::new()
                .id(prey)
                .at(510.0, 400.0)
                .size(10.0)
                .color(CreatureColor::Blue),
        )
        .with_creature(
            CreatureBuilder::new()
                .id(kin)
                .at(490.0, 400.0)
                .size(10.0)
                .color(CreatureColor::Red),
        )
        .build();

    let events = world.update().unwrap();

    assert_creature_dead!(world, prey);
    assert_creature_alive!(world, kin);
    assert_creature_alive!(world, hunter);
    let hunter = world.find_creature(hunter).unwrap();
    assert_eq!(hunter.prey_eaten, 1);
    assert_eq!(hunter.size, 35.0);
    assert!(events.iter().any(|e| matches!(
        e,
        LiveEvent::Death { id, cause, .. } if *id == prey && cause.starts_with("eaten by")
    )));
}

#[test]
fn test_extinction_resets_epoch_once() {
    let mut world = WorldBuilder::new()
        .with_config(|c| {
            c.world.initial_population = 4;
            c.world.initial_food = 10;
        })
        .build();
    for creature in &mut world.creatures {
        creature.energy = 0.0;
    }
    let generation = world.generation;

    let events = world.update().unwrap();

    let resets = events
        .iter()
        .filter(|e| matches!(e, LiveEvent::EpochReset { .. }))
        .count();
    assert_eq!(resets, 1);
    assert_eq!(world.generation, generation + 1);
    assert_population!(world, 4);

    // The fresh population is alive; the next tick does not reset again.
    let events = world.update().unwrap();
    assert!(!events
        .iter()
        .any(|e| matches!(e, LiveEvent::EpochReset { .. })));
    assert_eq!(world.generation, generation + 1);
}

#[test]
fn test_snapshot_lists_each_creature_once_without_policy() {
    let mut world = World::<RandomPolicy>::new(seeded_config(9)).unwrap();
    for _ in 0..50 {
        world.update().unwrap();
    }
    let snapshot = world.snapshot();
    assert_eq!(snapshot.creatures.len(), world.population());
    let ids: HashSet<Uuid> = snapshot.creatures.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), snapshot.creatures.len());
    for creature in &world.creatures {
        assert!(ids.contains(&creature.id));
    }

    let json = serde_json::to_value(&snapshot).unwrap();
    let text = json.to_string();
    assert!(!text.contains("policy"));
    assert!(!text.contains("weights"));
    assert_eq!(json["tick"], 50);
}
