use serde::{Deserialize, Serialize};

use crate::constants::ANONYMOUS_USER;
use crate::types::{Credentials, ShareRecord};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Starts (or updates) a game download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadRequest {
    pub app_id: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub anonymous: bool,
}

fn default_username() -> String {
    ANONYMOUS_USER.to_string()
}

fn default_true() -> bool {
    true
}

impl StartDownloadRequest {
    /// Credentials to pass to steamcmd; the anonymous flag wins over
    /// whatever was typed in the username/password fields.
    pub fn credentials(&self) -> Credentials {
        if self.anonymous {
            Credentials::anonymous()
        } else {
            Credentials::new(self.username.clone(), self.password.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadResponse {
    pub download_id: String,
    pub message: String,
}

/// A share row as listed in the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub share: ShareRecord,
    pub url: String,
    pub created_at: String,
}

/// State of the share file server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub running: bool,
    pub port: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub steamcmd_installed: bool,
    pub steamcmd_dir: String,
    pub games_dir: String,
    pub active_downloads: usize,
    pub file_server: ServerStatus,
}

/// Generic outcome of a fire-and-report action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Error body returned by the control API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
