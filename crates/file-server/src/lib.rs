//! Supervises the static HTTP server that publishes the shares directory.
//!
//! The server itself is an external program (by default
//! `python3 -m http.server <port>`) started with the shares directory as
//! its working directory. At most one instance runs at a time.

use std::path::PathBuf;
use std::process::Stdio;

use steamshelf_protocol::constants::DEFAULT_SHARE_PORT;
use steamshelf_protocol::messages::ServerStatus;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Placeholder in [`FileServerConfig::args`] replaced by the port.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Errors produced by the file server supervisor.
#[derive(Debug, thiserror::Error)]
pub enum FileServerError {
    #[error("Error starting server: {0}")]
    Start(#[from] std::io::Error),
}

/// How to launch the server.
#[derive(Debug, Clone)]
pub struct FileServerConfig {
    pub program: String,
    /// Arguments; `{port}` is substituted.
    pub args: Vec<String>,
    pub port: u16,
    /// Working directory (the shares directory).
    pub root: PathBuf,
}

impl FileServerConfig {
    /// `python3 -m http.server <port>` serving `root`.
    pub fn python(root: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            program: "python3".into(),
            args: vec!["-m".into(), "http.server".into(), PORT_PLACEHOLDER.into()],
            port,
            root: root.into(),
        }
    }

    fn resolved_args(&self) -> Vec<String> {
        let port = self.port.to_string();
        self.args
            .iter()
            .map(|a| a.replace(PORT_PLACEHOLDER, &port))
            .collect()
    }
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self::python(".", DEFAULT_SHARE_PORT)
    }
}

/// The running (or not) file server process.
pub struct FileServer {
    config: FileServerConfig,
    child: Mutex<Option<Child>>,
}

impl FileServer {
    pub fn new(config: FileServerConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Starts the server unless one is already running.
    pub async fn start(&self) -> Result<ServerStatus, FileServerError> {
        let mut slot = self.child.lock().await;
        if reap(&mut slot) {
            return Ok(self.status_msg(true, "Server already running"));
        }

        std::fs::create_dir_all(&self.config.root)?;

        let child = Command::new(&self.config.program)
            .args(self.config.resolved_args())
            .current_dir(&self.config.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .inspect_err(|e| tracing::error!("Error starting server: {e}"))?;

        tracing::info!(
            port = self.config.port,
            root = %self.config.root.display(),
            pid = child.id(),
            "file server started"
        );
        *slot = Some(child);

        let message = format!("File server running on port {}", self.config.port);
        Ok(self.status_msg(true, &message))
    }

    /// Stops the server if it is running.
    pub async fn stop(&self) -> ServerStatus {
        let mut slot = self.child.lock().await;
        if !reap(&mut slot) {
            return self.status_msg(false, "No server running");
        }

        if let Some(mut child) = slot.take() {
            steamshelf_steamcmd::stop_process(&mut child, steamshelf_steamcmd::CANCEL_TIMEOUT)
                .await;
        }
        tracing::info!(port = self.config.port, "file server stopped");
        self.status_msg(false, "Server stopped")
    }

    /// Whether the process is alive. An exited process is reaped.
    pub async fn is_running(&self) -> bool {
        reap(&mut *self.child.lock().await)
    }

    pub async fn status(&self) -> ServerStatus {
        if self.is_running().await {
            let message = format!("File server running on port {}", self.config.port);
            self.status_msg(true, &message)
        } else {
            self.status_msg(false, "Server not running")
        }
    }

    fn status_msg(&self, running: bool, message: &str) -> ServerStatus {
        ServerStatus {
            running,
            port: self.config.port,
            message: message.to_string(),
        }
    }
}

/// Returns `true` if the slot holds a live process; clears it otherwise.
fn reap(slot: &mut Option<Child>) -> bool {
    let Some(child) = slot.as_mut() else {
        return false;
    };
    match child.try_wait() {
        Ok(None) => true,
        Ok(Some(status)) => {
            tracing::warn!(%status, "file server exited");
            *slot = None;
            false
        }
        Err(e) => {
            tracing::warn!("failed to poll file server: {e}");
            *slot = None;
            false
        }
    }
}
