//! Entry point for the `glean` command-line client.
//!
//! - Parse arguments.
//! - Load configuration from `conf/config.toml` (or `--config`).
//! - Build the client stack and run the requested command.

mod cli;
mod commands;
mod render;

use crate::cli::Cli;
use anyhow::Result;
use clap::Parser;
use glean_core::config::load_config;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

#[tokio::main]
async fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle).await {
        error!("{err:?}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config);
    if let Some(server) = &cli.server {
        config.base_url = server.clone();
    }
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        server = %config.base_url,
        level = %config.log_level,
        "Starting Glean client"
    );
    commands::run(cli.command, config).await
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
