use clap::Args;
use evolarium_core::config::AppConfig;
use std::path::PathBuf;

/// Flags shared by every binary that builds a world from config.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML configuration file; defaults are used when it does not exist
    #[arg(short, long, default_value = "evolarium.toml")]
    pub config: PathBuf,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Tick period in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Founding population
    #[arg(long)]
    pub population: Option<usize>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ConfigArgs {
    /// Loads the config file and applies flag overrides on top.
    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(&self.config)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.scheduler.tick_ms = tick_ms;
        }
        if let Some(population) = self.population {
            config.world.initial_population = population;
        }
        if let Some(seed) = self.seed {
            config.world.seed = Some(seed);
        }
    }
}
