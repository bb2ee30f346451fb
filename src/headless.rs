//! Synchronous runner used for experiments and reproducibility checks.

use evolarium_core::config::{AppConfig, PolicyKind};
use evolarium_core::error::Result;
use evolarium_core::{DecisionPolicy, Metrics, QBrain, RandomPolicy, World};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeadlessSummary {
    pub seed: u64,
    pub ticks: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub peak_population: usize,
    pub births: usize,
    pub deaths: usize,
    pub kills: usize,
    pub foods_eaten: usize,
    pub epoch_resets: u32,
    pub generation: u32,
    pub best_score: f64,
    pub historical_best_score: f64,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub ticks: u64,
    /// Halt right after the first extinction and reset.
    pub stop_on_extinction: bool,
}

/// Steps `world` until the tick budget is spent or, when asked, the first
/// epoch reset.
pub fn run<P: DecisionPolicy>(
    world: &mut World<P>,
    options: RunOptions,
) -> Result<HeadlessSummary> {
    let metrics = Metrics::new();
    let mut summary = HeadlessSummary {
        seed: world.seed(),
        initial_population: world.population(),
        peak_population: world.population(),
        ..HeadlessSummary::default()
    };

    for _ in 0..options.ticks {
        let started = Instant::now();
        world.update()?;
        metrics.record_tick(started.elapsed(), world.population(), world.food_count());

        let report = &world.last_report;
        summary.ticks += 1;
        summary.births += report.births;
        summary.deaths += report.deaths;
        summary.kills += report.kills;
        summary.foods_eaten += report.foods_eaten;
        summary.peak_population = summary.peak_population.max(world.population());
        if report.epoch_reset {
            summary.epoch_resets += 1;
            if options.stop_on_extinction {
                break;
            }
        }
    }

    summary.final_population = world.population();
    summary.generation = world.generation;
    summary.best_score = world.fitness.epoch_best_score();
    summary.historical_best_score = world.fitness.historical_best_score();
    summary.hash = world.deterministic_hash();
    tracing::info!(
        ticks = summary.ticks,
        population = summary.final_population,
        generation = summary.generation,
        epoch_resets = summary.epoch_resets,
        "Headless run finished"
    );
    Ok(summary)
}

/// Builds a world for the configured policy kind and runs it.
pub fn run_config(config: AppConfig, options: RunOptions) -> Result<HeadlessSummary> {
    match config.policy.kind {
        PolicyKind::QLearning => run(&mut World::<QBrain>::new(config)?, options),
        PolicyKind::Random => run(&mut World::<RandomPolicy>::new(config)?, options),
    }
}
