mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use logbox::{api, config::Config, observability::Metrics};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            api::run(config).await?
        }
        Commands::Prune(args) => {
            let retention = args
                .retention
                .map(|r| r.as_duration())
                .unwrap_or_else(|| config.cache.retention.as_duration());
            let cache = api::open_cache(&config, Arc::new(Metrics::new()))?;
            let stats = cache.prune_expired(retention)?;
            info!(
                snapshots = stats.snapshots_pruned,
                rows = stats.rows_pruned,
                "Pruned expired job logs"
            );
        }
    }

    Ok(())
}
