//! Fallback installation of steamcmd itself.

use std::path::Path;

use tokio::process::Command;

use crate::{SteamCmd, SteamCmdError};

/// Official Linux tarball.
pub const STEAMCMD_URL: &str =
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_linux.tar.gz";

/// File name `wget` saves the tarball under.
pub const STEAMCMD_ARCHIVE: &str = "steamcmd_linux.tar.gz";

/// Creates every directory in `dirs` (and parents) if missing.
pub fn ensure_directories(dirs: &[&Path]) -> Result<(), SteamCmdError> {
    for dir in dirs {
        std::fs::create_dir_all(dir)?;
    }
    tracing::info!(
        dirs = ?dirs.iter().map(|d| d.display().to_string()).collect::<Vec<_>>(),
        "required directories verified"
    );
    Ok(())
}

impl SteamCmd {
    /// Downloads and unpacks steamcmd into the root directory.
    ///
    /// Runs `wget` then `tar` as two sequential subprocesses. A failure in
    /// either step is reported as a generic [`SteamCmdError::Install`]; a
    /// partially extracted tree is left in place.
    pub async fn install(&self) -> Result<String, SteamCmdError> {
        std::fs::create_dir_all(self.root())?;
        tracing::info!(root = %self.root().display(), "installing SteamCMD");

        let root = self.root().to_string_lossy().to_string();
        let archive = self.root().join(STEAMCMD_ARCHIVE);
        let archive = archive.to_string_lossy().to_string();

        let result = async {
            run_step("wget", &[STEAMCMD_URL, "-P", &root]).await?;
            run_step("tar", &["-xvzf", &archive, "-C", &root]).await
        }
        .await;

        match result {
            Ok(()) => {
                let msg = "SteamCMD installed successfully".to_string();
                tracing::info!("{msg}");
                Ok(msg)
            }
            Err(e) => {
                tracing::error!("Installation failed: {e}");
                Err(e)
            }
        }
    }
}

/// Runs one external command to completion, discarding its output.
async fn run_step(program: &str, args: &[&str]) -> Result<(), SteamCmdError> {
    tracing::debug!(program, ?args, "running install step");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| SteamCmdError::Install(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        return Err(SteamCmdError::Install(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    Ok(())
}
