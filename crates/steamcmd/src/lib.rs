//! steamcmd integration.
//!
//! Everything here is a thin wrapper over the external `steamcmd.sh`
//! launcher: checking that it is installed (and fetching it when not),
//! printing app metadata, launching `app_update` downloads, and scanning
//! the local install root for `app_<id>` directories.

mod app_info;
mod download;
mod install;
mod library;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::{Child, Command};

pub use app_info::{AppInfoFuture, AppInfoProvider, parse_app_name};
pub use download::{CANCEL_TIMEOUT, cancel_download, cleanup_failed_download, stop_process};
pub use install::{STEAMCMD_ARCHIVE, STEAMCMD_URL, ensure_directories};
pub use library::{format_size, game_path, get_directory_size, list_installed_games};

/// File name of the launcher script inside the steamcmd directory.
pub const LAUNCHER_NAME: &str = "steamcmd.sh";

/// How often a spawn is retried while the executable is busy.
const BUSY_RETRIES: u32 = 20;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Errors for steamcmd operations.
#[derive(Debug, thiserror::Error)]
pub enum SteamCmdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("installation failed: {0}")]
    Install(String),

    #[error("failed to launch steamcmd: {0}")]
    Spawn(String),

    #[error("invalid app id: {0:?}")]
    InvalidAppId(String),
}

/// Handle on a steamcmd installation directory.
#[derive(Debug, Clone)]
pub struct SteamCmd {
    root: PathBuf,
}

impl SteamCmd {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the steamcmd directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of `steamcmd.sh`.
    pub fn launcher_path(&self) -> PathBuf {
        self.root.join(LAUNCHER_NAME)
    }

    /// Returns true if the launcher script is present on disk.
    pub fn is_installed(&self) -> bool {
        let launcher = self.launcher_path();
        if launcher.exists() {
            tracing::info!(path = %launcher.display(), "SteamCMD installation verified");
            true
        } else {
            tracing::warn!(path = %launcher.display(), "SteamCMD not found");
            false
        }
    }
}

/// Returns true if `app_id` is a non-empty run of ASCII digits.
///
/// App ids end up in filesystem paths (`app_<id>`), so anything else is
/// rejected before it gets that far.
pub fn is_valid_app_id(app_id: &str) -> bool {
    !app_id.is_empty() && app_id.bytes().all(|b| b.is_ascii_digit())
}

/// Spawns `cmd`, retrying while the executable is open for writing.
///
/// `steamcmd.sh` is rewritten in place by installs and self-updates, and a
/// concurrent fork can briefly inherit the write handle; exec then fails
/// with `ETXTBSY` until it is closed.
pub(crate) async fn spawn_retrying(cmd: &mut Command) -> std::io::Result<Child> {
    let mut attempt = 0;
    loop {
        match cmd.spawn() {
            Err(e)
                if e.kind() == std::io::ErrorKind::ExecutableFileBusy
                    && attempt < BUSY_RETRIES =>
            {
                attempt += 1;
                tracing::debug!(attempt, "executable busy, retrying spawn");
                tokio::time::sleep(BUSY_RETRY_DELAY).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_path_is_under_root() {
        let sc = SteamCmd::new("/opt/steamcmd");
        assert_eq!(sc.launcher_path(), PathBuf::from("/opt/steamcmd/steamcmd.sh"));
    }

    #[test]
    fn is_installed_checks_launcher() {
        let tmp = tempfile::tempdir().unwrap();
        let sc = SteamCmd::new(tmp.path());
        assert!(!sc.is_installed());

        std::fs::write(sc.launcher_path(), "#!/bin/sh\n").unwrap();
        assert!(sc.is_installed());
    }

    #[test]
    fn app_id_validation() {
        assert!(is_valid_app_id("440"));
        assert!(is_valid_app_id("0"));
        assert!(!is_valid_app_id(""));
        assert!(!is_valid_app_id("../etc"));
        assert!(!is_valid_app_id("12a"));
        assert!(!is_valid_app_id(" 12"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn spawn_waits_for_busy_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("steamcmd.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        // An open write handle makes exec fail with ETXTBSY until dropped.
        let writer = std::fs::OpenOptions::new().write(true).open(&script).unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            drop(writer);
        });

        let mut child = spawn_retrying(&mut Command::new(&script)).await.unwrap();
        assert!(child.wait().await.unwrap().success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_reports_other_errors_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let err = spawn_retrying(&mut Command::new(tmp.path().join("missing")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
