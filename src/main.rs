use anyhow::Context;
use clap::Parser;
use stowage::adapter::inbound::cli::command::{Cli, Commands};
use stowage::adapter::inbound::cli::output::{self, OutputConfig};
use stowage::adapter::inbound::cli::{allocation, check};
use stowage::application::storage::Storage;
use stowage::infrastructure::config::settings::Config;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    cli.color.apply();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    if let Err(e) = run(cli).await {
        error!(error = %e, "command failed");
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.verbose {
        0 => config.init_logging(),
        1 => config.logging.init_with_level("debug"),
        _ => config.logging.init_with_level("trace"),
    }
    info!(config = %cli.config.display(), "stowage starting");

    let storage = Storage::initialize(&config.storage).await?;

    let outcome = tokio::select! {
        result = dispatch(&storage, &config, cli.command) => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    storage.shutdown().await?;
    outcome
}

async fn dispatch(storage: &Storage, config: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Check => check::execute(storage, config).await?,
        Commands::Allocations(command) => allocation::execute(storage, command).await?,
    }
    Ok(())
}
