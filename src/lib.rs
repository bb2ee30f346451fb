//! Evolarium: an arena of color-coded creatures that forage, hunt, split and
//! learn, streamed live to WebSocket observers.
//!
//! The engine lives in `evolarium_core`; this crate re-exports it under
//! [`model`] and adds the synchronous [`headless`] runner.

pub mod headless;

/// Facade over the simulation crates.
pub mod model {
    pub use evolarium_core::{
        brain, config, creature, error, fitness, history, metrics, scheduler, sensing, systems,
        world,
    };
    pub use evolarium_data as data;
    pub use evolarium_net as net;
}

pub use headless::{HeadlessSummary, RunOptions};
