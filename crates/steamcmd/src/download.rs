//! `app_update` launches, cancellation and cleanup.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use steamshelf_protocol::Credentials;
use tokio::process::{Child, Command};

use crate::{SteamCmd, SteamCmdError, is_valid_app_id};

/// Grace period between terminate and kill.
pub const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

impl SteamCmd {
    /// Launches `+app_update <app_id> validate` into `install_dir`.
    ///
    /// Returns as soon as the process is spawned. stdout and stderr are
    /// piped; the caller owns the child from here on (reading output,
    /// cancelling, reaping).
    pub async fn download_game(
        &self,
        app_id: &str,
        credentials: &Credentials,
        install_dir: &Path,
    ) -> Result<Child, SteamCmdError> {
        if !is_valid_app_id(app_id) {
            return Err(SteamCmdError::InvalidAppId(app_id.to_string()));
        }

        tokio::fs::create_dir_all(install_dir).await?;

        let mut cmd = Command::new(self.launcher_path());
        cmd.arg("+login").arg(&credentials.username);
        if !credentials.password.is_empty() {
            cmd.arg(&credentials.password);
        }
        cmd.arg("+force_install_dir")
            .arg(install_dir)
            .args(["+app_update", app_id, "validate", "+quit"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = crate::spawn_retrying(&mut cmd)
            .await
            .map_err(|e| SteamCmdError::Spawn(format!("{}: {e}", self.launcher_path().display())))?;

        tracing::info!(
            app_id,
            user = %credentials.username,
            dir = %install_dir.display(),
            pid = child.id(),
            "download started"
        );
        Ok(child)
    }
}

/// Cancels a running download.
///
/// Returns `false` without touching anything if the process has already
/// exited. Otherwise sends a graceful terminate, waits up to
/// [`CANCEL_TIMEOUT`], then kills.
pub async fn cancel_download(child: &mut Child) -> bool {
    stop_process(child, CANCEL_TIMEOUT).await
}

/// Terminate-then-kill with a custom grace period.
pub async fn stop_process(child: &mut Child, grace: Duration) -> bool {
    match child.try_wait() {
        Ok(Some(status)) => {
            tracing::debug!(%status, "process already exited");
            return false;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("failed to poll process: {e}");
            return false;
        }
    }

    send_terminate(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::info!(%status, "process terminated"),
        Ok(Err(e)) => tracing::warn!("failed to wait for process: {e}"),
        Err(_) => {
            tracing::warn!(grace = ?grace, "process ignored terminate, killing");
            if let Err(e) = child.kill().await {
                tracing::warn!("failed to kill process: {e}");
            }
        }
    }
    true
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SAFETY: `pid` is our own child and has not been reaped (id() is Some).
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        tracing::warn!(pid, "SIGTERM failed: {}", std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!("failed to terminate process: {e}");
    }
}

/// Removes a (partial) install directory.
///
/// A missing directory counts as success. Errors are logged and turned
/// into `false`.
pub fn cleanup_failed_download(games_dir: &Path, app_id: &str) -> bool {
    if !is_valid_app_id(app_id) {
        tracing::error!(app_id, "refusing to clean up invalid app id");
        return false;
    }

    let install_dir = crate::game_path(games_dir, app_id);
    if !install_dir.exists() {
        return true;
    }

    match std::fs::remove_dir_all(&install_dir) {
        Ok(()) => {
            tracing::info!(path = %install_dir.display(), "removed install directory");
            true
        }
        Err(e) => {
            tracing::error!(path = %install_dir.display(), "Failed to remove directory: {e}");
            false
        }
    }
}
