//! Application orchestrator: wires the libraries together and serves the
//! control panel.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use steamshelf_downloads::DownloadRegistry;
use steamshelf_file_server::FileServer;
use steamshelf_shares::ShareRegistry;
use steamshelf_steamcmd::{SteamCmd, ensure_directories};
use tokio::net::TcpListener;

use crate::api;
use crate::config::Config;

/// Everything the API handlers need.
pub struct AppState {
    pub steamcmd: SteamCmd,
    pub games_dir: PathBuf,
    pub downloads: DownloadRegistry,
    pub shares: ShareRegistry,
    pub file_server: FileServer,
    pub share_host: String,
    pub share_port: u16,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            steamcmd: SteamCmd::new(config.steamcmd_path()),
            games_dir: config.games_path(),
            downloads: DownloadRegistry::new(),
            shares: ShareRegistry::new(config.share_db_path(), config.shares_path()),
            file_server: FileServer::new(config.file_server()),
            share_host: config.share_host.clone(),
            share_port: config.share_port,
        }
    }
}

/// Runs steamshelf until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config));

    // -- steamcmd --
    ensure_directories(&[state.steamcmd.root(), state.games_dir.as_path()])?;
    if !state.steamcmd.is_installed() {
        if config.auto_install {
            tracing::info!("installing SteamCMD");
            match state.steamcmd.install().await {
                Ok(msg) => tracing::info!("{msg}"),
                Err(e) => tracing::error!("Installation failed: {e}"),
            }
        }
        if !state.steamcmd.is_installed() {
            anyhow::bail!(
                "SteamCMD is not available in {}",
                state.steamcmd.root().display()
            );
        }
    }

    // -- Shares --
    if let Err(e) = state.shares.ensure_share_dir().await {
        tracing::warn!("cannot prepare shares directory: {e}");
    }

    // -- Control panel --
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.ui_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "control panel listening");

    axum::serve(listener, api::router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // -- Graceful shutdown --
    tracing::info!("stopping services...");
    state.downloads.shutdown().await;
    state.file_server.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("SIGINT received, shutting down"),
        Err(e) => tracing::error!("failed to listen for Ctrl-C: {e}"),
    }
}
