use anyhow::Result;
use clap::Parser;
use evolarium_lib::headless::{self, RunOptions};
use evolarium_server::cli::ConfigArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// How to run the simulation
    #[arg(short, long, value_enum, default_value = "headless")]
    mode: Mode,

    /// Ticks to run in headless mode
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Stop headless mode after the first extinction
    #[arg(long)]
    stop_on_extinction: bool,

    /// Print the headless summary as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Headless,
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    evolarium_core::init_logging("evolarium=info,evolarium_server=info,evolarium_core=info");
    let args = Args::parse();
    let mut config = args.config.load()?;

    match args.mode {
        Mode::Headless => {
            // A seeded headless run trains inline so it can be replayed.
            if config.world.seed.is_some() {
                config.world.deterministic = true;
            }
            let options = RunOptions {
                ticks: args.ticks,
                stop_on_extinction: args.stop_on_extinction,
            };
            let summary =
                tokio::task::spawn_blocking(move || headless::run_config(config, options)).await??;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Seed:          {}", summary.seed);
                println!("Ticks:         {}", summary.ticks);
                println!(
                    "Population:    {} -> {} (peak {})",
                    summary.initial_population, summary.final_population, summary.peak_population
                );
                println!(
                    "Births/deaths: {} / {} ({} kills, {} food eaten)",
                    summary.births, summary.deaths, summary.kills, summary.foods_eaten
                );
                println!(
                    "Generation:    {} ({} resets)",
                    summary.generation, summary.epoch_resets
                );
                println!(
                    "Best score:    {:.2} (all-time {:.2})",
                    summary.best_score, summary.historical_best_score
                );
                println!("State hash:    {}", summary.hash);
            }
        }
        Mode::Serve => evolarium_server::serve(config).await?,
    }
    Ok(())
}
