//! # Evolarium Core
//!
//! The simulation engine for Evolarium, a 2D arena of color-coded creatures
//! that forage, hunt, split and learn.
//!
//! This crate contains:
//! - Decision policies (a small Q-learning network and a random baseline)
//!   behind a handle that trains without blocking the tick
//! - Sensing, movement, feeding, predation and reproduction systems
//! - Seasons, food respawn and fitness tracking across epochs
//! - A fixed-rate scheduler that publishes snapshots
//! - Metrics collection and structured logging
//!
//! ## Example
//!
//! ```
//! use evolarium_core::brain::RandomPolicy;
//! use evolarium_core::config::AppConfig;
//! use evolarium_core::world::World;
//!
//! let mut config = AppConfig::default();
//! config.world.seed = Some(42);
//! let mut world = World::<RandomPolicy>::new(config).unwrap();
//! let events = world.update().unwrap();
//! assert_eq!(world.tick, 1);
//! # let _ = events;
//! ```

/// Decision policies and the training handle
pub mod brain;
/// Configuration management for simulation parameters
pub mod config;
/// Creature state, death causes and fitness scoring
pub mod creature;
/// Error types
pub mod error;
/// Best-individual records across epochs
pub mod fitness;
/// Structured simulation events
pub mod history;
/// Performance metrics collection and logging
pub mod metrics;
/// Fixed-rate tick driver
pub mod scheduler;
/// Nearest-neighbour perception
pub mod sensing;
/// Per-tick simulation systems
pub mod systems;
/// The world aggregate and its update pipeline
pub mod world;

pub use brain::{DecisionPolicy, QBrain, RandomPolicy};
pub use config::AppConfig;
pub use error::{PolicyError, SimError};
pub use history::LiveEvent;
pub use metrics::{init_logging, Metrics, MetricsSnapshot};
pub use scheduler::{SchedulerEvent, SchedulerHandle, SchedulerStatus};
pub use world::{TickReport, World};
