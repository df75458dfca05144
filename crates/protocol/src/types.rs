use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ANONYMOUS_USER, MAX_PROGRESS};

/// A game found under the install root.
///
/// There is no manifest: the `app_<id>` directory is the record, and
/// the size is recomputed every time the library is listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledGame {
    pub app_id: String,
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub size: String,
}

/// Metadata looked up through `app_info_print`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub app_id: String,
    pub name: String,
}

impl GameInfo {
    /// Placeholder returned whenever the lookup fails.
    pub fn unknown(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            name: format!("Unknown Game ({app_id})"),
        }
    }
}

/// Login passed to steamcmd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// No-credential login.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER, "")
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USER
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Status tag of a tracked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Launched, no `Error`/`Success` line seen yet.
    Starting,
    /// An output line contained `Error`.
    Error,
    /// An output line contained `Success`.
    Completed,
    /// Cancelled through the registry.
    Cancelled,
    /// Process exited without printing either marker.
    Finished,
}

impl DownloadStatus {
    /// Returns `true` once the monitor has nothing left to do.
    pub fn is_terminal(self) -> bool {
        !matches!(self, DownloadStatus::Starting)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Starting => write!(f, "starting"),
            DownloadStatus::Error => write!(f, "error"),
            DownloadStatus::Completed => write!(f, "completed"),
            DownloadStatus::Cancelled => write!(f, "cancelled"),
            DownloadStatus::Finished => write!(f, "finished"),
        }
    }
}

/// In-memory bookkeeping for one download.
///
/// `progress` counts output lines, capped at 100. It says nothing about
/// bytes transferred and may reach 100 before the process is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    pub id: String,
    pub app_id: String,
    pub game_name: String,
    pub progress: u8,
    pub status: DownloadStatus,
    pub started_at: DateTime<Utc>,
}

impl DownloadEntry {
    pub fn new(id: String, app_id: String, game_name: String) -> Self {
        Self {
            id,
            app_id,
            game_name,
            progress: 0,
            status: DownloadStatus::Starting,
            started_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Bumps the line counter by one, saturating at 100.
    pub fn bump_progress(&mut self) {
        if self.progress < MAX_PROGRESS {
            self.progress += 1;
        }
    }
}

/// One entry of the share registry file.
///
/// Field names are the on-disk format of `shares.json` and stay snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub game_name: String,
    pub app_id: String,
    pub created_at: i64,
    pub path: String,
}
