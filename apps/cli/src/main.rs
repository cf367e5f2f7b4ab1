//! cloudpan command-line entry point.

mod app;
mod args;
mod config;
mod render;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = args::Cli::parse();

    // Initialize structured logging.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting cloudpan");

    let config_path = config::Config::path_or_default(cli.config.as_deref())?;
    let config = config::Config::load(&config_path)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli.command, config, &config_path))
}
