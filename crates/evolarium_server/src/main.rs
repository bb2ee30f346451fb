use clap::Parser;
use evolarium_server::cli::ConfigArgs;

/// Runs the simulation and streams it to WebSocket observers.
#[derive(Parser, Debug)]
#[command(name = "evolarium-server", version, about)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    evolarium_core::init_logging("evolarium_server=info,evolarium_core=info");
    let args = Args::parse();
    let config = args.config.load()?;
    tracing::info!(config = %config.fingerprint(), "Configuration loaded");
    evolarium_server::serve(config).await
}
