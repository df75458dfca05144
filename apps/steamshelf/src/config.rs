//! steamshelf configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/steamshelf/config.toml`
//! - Windows: `%APPDATA%/steamshelf/config.toml`
//!
//! `STEAMSHELF_CONFIG` points at an alternative file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use steamshelf_file_server::{FileServerConfig, PORT_PLACEHOLDER};
use steamshelf_protocol::constants::{DEFAULT_SHARE_HOST, DEFAULT_SHARE_PORT, DEFAULT_UI_PORT};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STEAMSHELF_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// steamcmd installation directory.
    #[serde(default = "default_steamcmd_dir")]
    pub steamcmd_dir: String,

    /// Root for `app_<id>` install directories.
    #[serde(default = "default_games_dir")]
    pub games_dir: String,

    /// Directory holding share symlinks; the file server root.
    #[serde(default = "default_shares_dir")]
    pub shares_dir: String,

    /// JSON share database.
    #[serde(default = "default_share_db_file")]
    pub share_db_file: String,

    /// Control panel port (bound to 127.0.0.1).
    #[serde(default = "default_ui_port")]
    pub ui_port: u16,

    /// Host advertised in share URLs.
    #[serde(default = "default_share_host")]
    pub share_host: String,

    /// File server port.
    #[serde(default = "default_share_port")]
    pub share_port: u16,

    #[serde(default = "default_file_server_program")]
    pub file_server_program: String,

    /// File server arguments; `{port}` is replaced by `share_port`.
    #[serde(default = "default_file_server_args")]
    pub file_server_args: Vec<String>,

    /// Fetch steamcmd on startup when it is missing.
    #[serde(default = "default_true")]
    pub auto_install: bool,
}

fn default_steamcmd_dir() -> String {
    "~/steamcmd".into()
}

fn default_games_dir() -> String {
    "~/steam_games".into()
}

fn default_shares_dir() -> String {
    "~/public_shares".into()
}

fn default_share_db_file() -> String {
    "~/steamcmd/shares.json".into()
}

fn default_ui_port() -> u16 {
    DEFAULT_UI_PORT
}

fn default_share_host() -> String {
    DEFAULT_SHARE_HOST.into()
}

fn default_share_port() -> u16 {
    DEFAULT_SHARE_PORT
}

fn default_file_server_program() -> String {
    "python3".into()
}

fn default_file_server_args() -> Vec<String> {
    vec!["-m".into(), "http.server".into(), PORT_PLACEHOLDER.into()]
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steamcmd_dir: default_steamcmd_dir(),
            games_dir: default_games_dir(),
            shares_dir: default_shares_dir(),
            share_db_file: default_share_db_file(),
            ui_port: default_ui_port(),
            share_host: default_share_host(),
            share_port: default_share_port(),
            file_server_program: default_file_server_program(),
            file_server_args: default_file_server_args(),
            auto_install: default_true(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn steamcmd_path(&self) -> PathBuf {
        expand_home(&self.steamcmd_dir)
    }

    pub fn games_path(&self) -> PathBuf {
        expand_home(&self.games_dir)
    }

    pub fn shares_path(&self) -> PathBuf {
        expand_home(&self.shares_dir)
    }

    pub fn share_db_path(&self) -> PathBuf {
        expand_home(&self.share_db_file)
    }

    pub fn file_server(&self) -> FileServerConfig {
        FileServerConfig {
            program: self.file_server_program.clone(),
            args: self.file_server_args.clone(),
            port: self.share_port,
            root: self.shares_path(),
        }
    }
}

fn home_dir() -> PathBuf {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";

    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, &home_dir())
}

fn expand_home_with(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("steamshelf").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        home_dir().join(".config").join("steamshelf").join("config.toml")
    }
}
