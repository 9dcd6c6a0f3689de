//! cbprov - declarative bucket and DDL provisioning for Couchbase clusters.

use cb_provision::cli::Cli;
use cb_provision::config::Config;
use cb_provision::error::Result;
use cb_provision::provision;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    info!("Loading config from: {}", cli.config.display());
    let config = Config::load_from_file(&cli.config)?;

    provision::run(&config).await?;

    info!("Provisioning completed successfully");
    Ok(())
}
