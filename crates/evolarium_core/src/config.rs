//! Configuration management for simulation parameters.
//!
//! Every tunable of the simulation lives in one [`AppConfig`] that maps onto a
//! `config.toml` file. Missing sections fall back to their defaults, which
//! reproduce the stock arena: 1900×800, 20 creatures, 50 food pellets and a
//! 15 ms tick.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. `config.toml` file (overrides defaults)
//! 3. Command-line flags of the binaries (override both)
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! initial_population = 40
//! seed = 42
//! deterministic = true
//!
//! [border]
//! policy = "lethal"
//!
//! [reproduction]
//! offspring = { rule = "fixed", count = 3 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Arena dimensions and seeding.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub initial_population: usize,
    pub initial_food: usize,
    pub seed: Option<u64>,
    pub deterministic: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1900.0,
            height: 800.0,
            initial_population: 20,
            initial_food: 50,
            seed: None,
            deterministic: false,
        }
    }
}

/// Body, movement and metabolism of a single creature.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CreatureConfig {
    pub initial_size: f64,
    pub min_size: f64,
    pub initial_energy: f64,
    pub speed_multiplier: f64,
    pub frame_rate_multiplier: f64,
    /// Fraction of an action's force that reaches the accumulator each tick.
    pub force_smoothing: f64,
    pub energy_drain_per_speed: f64,
    pub olfactory_min_range: f64,
    pub olfactory_max_range: f64,
    /// Size at which the olfactory range saturates.
    pub olfactory_size_cap: f64,
    /// Ticks without a meal before the creature loses size.
    pub hunger_threshold: u64,
    pub hunger_size_loss: f64,
}

impl Default for CreatureConfig {
    fn default() -> Self {
        Self {
            initial_size: 11.0,
            min_size: 5.0,
            initial_energy: 100.0,
            speed_multiplier: 1.0,
            frame_rate_multiplier: 1.5,
            force_smoothing: 0.2,
            energy_drain_per_speed: 0.08,
            olfactory_min_range: 75.0,
            olfactory_max_range: 250.0,
            olfactory_size_cap: 100.0,
            hunger_threshold: 1000,
            hunger_size_loss: 1.0,
        }
    }
}

impl CreatureConfig {
    #[must_use]
    pub fn max_speed(&self) -> f64 {
        self.speed_multiplier * self.frame_rate_multiplier
    }
}

/// What happens to a creature that reaches the arena edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BorderPolicy {
    /// Clamp into the arena and bounce; dwell timeouts still apply.
    #[default]
    Reflect,
    /// Clamp into the arena and stop on that axis.
    Clamp,
    /// Leaving the arena kills immediately.
    Lethal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BorderConfig {
    pub policy: BorderPolicy,
    pub corner_margin: f64,
    pub corner_timeout: u32,
    pub immobile_epsilon: f64,
    pub immobile_timeout: u32,
    pub border_timeout: u32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            policy: BorderPolicy::Reflect,
            corner_margin: 50.0,
            corner_timeout: 180,
            immobile_epsilon: 1.0,
            immobile_timeout: 180,
            border_timeout: 600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FoodConfig {
    pub lifetime: i64,
    pub initial_speed: f64,
    pub drift: f64,
    pub max_speed: f64,
    pub growth_chance: f64,
    pub max_food: usize,
    pub normal_size_gain: f64,
    pub normal_energy_gain: f64,
    pub growth_size_gain: f64,
    pub growth_energy_gain: f64,
    /// Energy gained per unit of victim size.
    pub predation_energy_per_size: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            lifetime: 3600,
            initial_speed: 0.25,
            drift: 0.025,
            max_speed: 0.125,
            growth_chance: 0.5,
            max_food: 500,
            normal_size_gain: 2.0,
            normal_energy_gain: 100.0,
            growth_size_gain: 4.0,
            growth_energy_gain: 200.0,
            predation_energy_per_size: 50.0,
        }
    }
}

/// How many children a mature creature splits into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "rule", content = "count", rename_all = "lowercase")]
pub enum OffspringRule {
    /// Spring 5, summer 4, autumn 4 or 3, winter 3.
    #[default]
    Seasonal,
    Fixed(u32),
}

impl OffspringRule {
    /// Largest litter this rule can produce.
    #[must_use]
    pub fn max_litter(&self) -> u32 {
        match self {
            OffspringRule::Seasonal => 5,
            OffspringRule::Fixed(n) => *n,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReproductionConfig {
    pub maturity_size: f64,
    pub offspring: OffspringRule,
    pub child_size_fraction: f64,
    pub parent_shrink_divisor: f64,
    pub mutation_rate_min: f32,
    pub mutation_rate_max: f32,
    /// Multiplier applied to a color's population share.
    pub color_mutation_k: f64,
    pub color_mutation_cap: f64,
    /// Children that share one mutant color before a new one is drawn.
    pub mutation_window: u32,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            maturity_size: 37.5,
            offspring: OffspringRule::Seasonal,
            child_size_fraction: 0.9,
            parent_shrink_divisor: 3.0,
            mutation_rate_min: 0.01,
            mutation_rate_max: 0.06,
            color_mutation_k: 2.0,
            color_mutation_cap: 0.9,
            mutation_window: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FitnessConfig {
    pub age_weight: f64,
    pub food_weight: f64,
    pub prey_multiplier: f64,
    pub reproduction_weight: f64,
    pub scale_by_energy: bool,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            age_weight: 0.01,
            food_weight: 1.0,
            prey_multiplier: 2.0,
            reproduction_weight: 3.0,
            scale_by_energy: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SeasonConfig {
    pub season_length: u64,
    pub year_ticks: u64,
    pub days_per_year: u64,
    pub respawn_spring: u64,
    pub respawn_summer: u64,
    pub respawn_autumn: u64,
    pub respawn_winter: u64,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            season_length: 3600,
            year_ticks: 14400,
            days_per_year: 365,
            respawn_spring: 10,
            respawn_summer: 50,
            respawn_autumn: 100,
            respawn_winter: 200,
        }
    }
}

/// Where policy training runs relative to the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrainingMode {
    /// Fire-and-forget on the rayon pool.
    #[default]
    Background,
    /// Train on the calling thread; used for reproducible runs.
    Inline,
    /// Buffer experiences, never train.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    QLearning,
    Random,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    pub training: TrainingMode,
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f32,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    pub batch_size: usize,
    pub memory_size: usize,
    /// Feedback events between two training rounds.
    pub train_every: u64,
    pub mutation_scale: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::QLearning,
            training: TrainingMode::Background,
            hidden_layers: vec![16, 8],
            learning_rate: 0.001,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            batch_size: 64,
            memory_size: 5000,
            train_every: 10,
            mutation_scale: 4.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_ms: u64,
    /// Emit a snapshot every N ticks.
    pub broadcast_every: u64,
    pub event_capacity: usize,
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 15,
            broadcast_every: 1,
            event_capacity: 64,
            autostart: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub compress_initial: bool,
    /// Frames buffered per observer before it counts as lagging.
    pub observer_buffer: usize,
    /// Consecutive on-time frames before a lagging observer returns to text.
    pub recover_after: u32,
    pub send_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            compress_initial: false,
            observer_buffer: 16,
            recover_after: 30,
            send_timeout_ms: 250,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub creature: CreatureConfig,
    pub border: BorderConfig,
    pub food: FoodConfig,
    pub reproduction: ReproductionConfig,
    pub fitness: FitnessConfig,
    pub season: SeasonConfig,
    pub policy: PolicyConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // World validation
        anyhow::ensure!(
            self.world.width > 0.0 && self.world.width.is_finite(),
            "World width must be positive"
        );
        anyhow::ensure!(
            self.world.height > 0.0 && self.world.height.is_finite(),
            "World height must be positive"
        );
        anyhow::ensure!(
            self.world.initial_population <= 10000,
            "Initial population too large (max 10000)"
        );
        anyhow::ensure!(
            self.world.initial_food <= self.food.max_food,
            "Initial food exceeds max food"
        );

        // Creature validation
        let c = &self.creature;
        anyhow::ensure!(c.min_size > 0.0, "Min size must be positive");
        anyhow::ensure!(
            c.initial_size > c.min_size,
            "Initial size must exceed min size"
        );
        anyhow::ensure!(c.initial_energy > 0.0, "Initial energy must be positive");
        anyhow::ensure!(c.max_speed() > 0.0, "Max speed must be positive");
        anyhow::ensure!(
            c.force_smoothing > 0.0 && c.force_smoothing <= 1.0,
            "Force smoothing must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            c.energy_drain_per_speed >= 0.0,
            "Energy drain must be non-negative"
        );
        anyhow::ensure!(
            c.olfactory_min_range <= c.olfactory_max_range,
            "Olfactory min range must not exceed max range"
        );
        anyhow::ensure!(
            c.olfactory_size_cap > c.min_size,
            "Olfactory size cap must exceed min size"
        );
        anyhow::ensure!(c.hunger_threshold > 0, "Hunger threshold must be positive");

        // Food validation
        anyhow::ensure!(self.food.lifetime > 0, "Food lifetime must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.food.growth_chance),
            "Growth chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.food.max_speed >= 0.0, "Food speed must be non-negative");

        // Reproduction validation
        let r = &self.reproduction;
        anyhow::ensure!(
            r.maturity_size > c.initial_size,
            "Maturity size must exceed initial size"
        );
        anyhow::ensure!(
            r.offspring.max_litter() > 0,
            "Offspring count must be positive"
        );
        anyhow::ensure!(
            r.child_size_fraction > 0.0 && r.child_size_fraction <= 1.0,
            "Child size fraction must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            r.maturity_size * r.child_size_fraction / f64::from(r.offspring.max_litter())
                > c.min_size,
            "Offspring of a mature creature would be born below min size"
        );
        anyhow::ensure!(
            r.parent_shrink_divisor >= 1.0,
            "Parent shrink divisor must be at least 1"
        );
        anyhow::ensure!(
            r.mutation_rate_min >= 0.0 && r.mutation_rate_min < r.mutation_rate_max,
            "Mutation rate range must be non-empty and non-negative"
        );
        anyhow::ensure!(
            r.color_mutation_k >= 0.0,
            "Color mutation factor must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&r.color_mutation_cap),
            "Color mutation cap must be in [0.0, 1.0]"
        );
        anyhow::ensure!(r.mutation_window > 0, "Mutation window must be positive");

        // Season validation
        let s = &self.season;
        anyhow::ensure!(s.season_length > 0, "Season length must be positive");
        anyhow::ensure!(s.year_ticks > 0, "Year length must be positive");
        anyhow::ensure!(
            s.respawn_spring > 0
                && s.respawn_summer > 0
                && s.respawn_autumn > 0
                && s.respawn_winter > 0,
            "Food respawn intervals must be positive"
        );

        // Policy validation
        let p = &self.policy;
        anyhow::ensure!(
            p.learning_rate > 0.0 && p.learning_rate <= 1.0,
            "Learning rate must be in (0.0, 1.0]"
        );
        anyhow::ensure!((0.0..=1.0).contains(&p.gamma), "Gamma must be in [0.0, 1.0]");
        anyhow::ensure!(
            p.epsilon_min <= p.epsilon_start && p.epsilon_start <= 1.0,
            "Epsilon bounds are inconsistent"
        );
        anyhow::ensure!(p.batch_size > 0, "Batch size must be positive");
        anyhow::ensure!(
            p.memory_size >= p.batch_size,
            "Replay memory must hold at least one batch"
        );
        anyhow::ensure!(p.train_every > 0, "Training interval must be positive");
        anyhow::ensure!(
            p.hidden_layers.iter().all(|&n| n > 0),
            "Hidden layers must not be empty"
        );

        // Scheduler validation
        anyhow::ensure!(self.scheduler.tick_ms > 0, "Tick period must be positive");
        anyhow::ensure!(
            self.scheduler.broadcast_every > 0,
            "Broadcast cadence must be positive"
        );
        anyhow::ensure!(
            self.scheduler.event_capacity > 0,
            "Event channel capacity must be positive"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is an
    /// error, since a half-applied configuration is worse than none.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
        }
    }

    /// Hash of every section that influences simulation outcomes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.creature).as_bytes());
        hasher.update(format!("{:?}", self.border).as_bytes());
        hasher.update(format!("{:?}", self.food).as_bytes());
        hasher.update(format!("{:?}", self.reproduction).as_bytes());
        hasher.update(format!("{:?}", self.fitness).as_bytes());
        hasher.update(format!("{:?}", self.season).as_bytes());
        hasher.update(format!("{:?}", self.policy).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_world_width() {
        let config = AppConfig {
            world: WorldConfig {
                width: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_offspring_born_below_min_size_rejected() {
        let config = AppConfig {
            reproduction: ReproductionConfig {
                offspring: OffspringRule::Fixed(10),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [world]
            initial_population = 7

            [border]
            policy = "lethal"

            [reproduction]
            offspring = { rule = "fixed", count = 3 }
            "#,
        )
        .unwrap();
        assert_eq!(config.world.initial_population, 7);
        assert_eq!(config.world.width, 1900.0);
        assert_eq!(config.border.policy, BorderPolicy::Lethal);
        assert_eq!(config.reproduction.offspring, OffspringRule::Fixed(3));
        assert_eq!(config.scheduler.tick_ms, 15);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(AppConfig::from_toml("[scheduler]\ntick_ms = 0\n").is_err());
        assert!(AppConfig::from_toml("not toml at all [").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("/nonexistent/evolarium/config.toml").unwrap();
        assert_eq!(config.world.initial_food, 50);
    }

    #[test]
    fn test_fingerprint_tracks_simulation_sections() {
        let a = AppConfig::default();
        let mut b = AppConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.server.port = 9999;
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.food.lifetime = 10;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
