mod commands;
mod config;
mod detect;
mod download;
mod error;
mod fetch;
mod registry;
mod report;
mod store;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use commands::{AppState, Cli};
use config::WatchConfig;
use fetch::{ContentFetcher, HttpSource};
use registry::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env before clap so .env values feed `env = ...` args
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    let config = WatchConfig::from_env();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let registry = Registry::load_or_default(&config.registry_path);
    info!(
        source = %registry.source(),
        total = registry.len(),
        enabled = registry.enabled_count(),
        "registry ready"
    );

    let fetcher = ContentFetcher::new(Arc::new(HttpSource::new()?));

    let state = AppState {
        config,
        registry,
        fetcher,
    };

    commands::dispatch(&state, cli).await
}
