//! ecoclaim server binary entry point.

use clap::Parser;
use ecoclaim::cli::Cli;
use ecoclaim::config::ServerConfig;
use ecoclaim::server::{self, AppState};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ecoclaim=info,tower_http=info";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "server exited");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ecoclaim::error::Result<()> {
    let mut config = ServerConfig::from_env()?;
    cli.apply(&mut config);
    tracing::debug!(?config, "loaded config");

    server::serve(AppState::from_config(config)).await
}
