//! steamshelf entry point.

mod api;
mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting steamshelf");

    let config = config::Config::load()?;
    tracing::info!(
        steamcmd_dir = %config.steamcmd_dir,
        games_dir = %config.games_dir,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("steamshelf shut down cleanly");
    Ok(())
}
