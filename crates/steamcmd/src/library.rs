//! The local game library: `app_<id>` directories under the games root.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use steamshelf_protocol::InstalledGame;
use walkdir::WalkDir;

use crate::AppInfoProvider;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Returns the install directory for an app: `<games_dir>/app_<id>`.
pub fn game_path(games_dir: &Path, app_id: &str) -> PathBuf {
    games_dir.join(format!("app_{app_id}"))
}

/// Lists every game installed under `games_dir`.
///
/// Only directories named exactly `app_<digits>` count. Names come from
/// `info`; sizes are recomputed by walking each directory. A missing
/// root yields an empty list.
pub async fn list_installed_games(
    games_dir: &Path,
    info: &dyn AppInfoProvider,
) -> Vec<InstalledGame> {
    let entries = match std::fs::read_dir(games_dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(dir = %games_dir.display(), "cannot read games dir: {e}");
            return Vec::new();
        }
    };

    let mut found: Vec<(u64, String, PathBuf)> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name();
            let app_id = parse_app_dir_name(&name.to_string_lossy())?;
            let sort_key = app_id.parse::<u64>().unwrap_or(u64::MAX);
            Some((sort_key, app_id, e.path()))
        })
        .collect();
    found.sort();

    let mut games = Vec::with_capacity(found.len());
    for (_, app_id, path) in found {
        let name = info.game_info(&app_id).await.name;

        let walk_path = path.clone();
        let size_bytes = tokio::task::spawn_blocking(move || get_directory_size(&walk_path))
            .await
            .unwrap_or(0);

        games.push(InstalledGame {
            app_id,
            name,
            path: path.to_string_lossy().to_string(),
            size_bytes,
            size: format_size(size_bytes),
        });
    }

    tracing::debug!(count = games.len(), "listed installed games");
    games
}

/// Extracts the app id from an `app_<digits>` directory name.
fn parse_app_dir_name(name: &str) -> Option<String> {
    static APP_DIR_RE: OnceLock<Regex> = OnceLock::new();
    let re = APP_DIR_RE.get_or_init(|| Regex::new(r"^app_([0-9]+)$").expect("valid app dir regex"));
    re.captures(name).map(|c| c[1].to_string())
}

/// Total size in bytes of the regular files under `path`.
///
/// Symlinks are not followed and unreadable entries are skipped.
pub fn get_directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Formats a byte count with two decimals in binary units.
///
/// `0` is special-cased to `"0 B"`.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppInfoFuture;
    use std::sync::Mutex;
    use steamshelf_protocol::GameInfo;

    /// Names every app `Game <id>` and records the lookups.
    #[derive(Default)]
    struct StaticInfo {
        lookups: Mutex<Vec<String>>,
    }

    impl AppInfoProvider for StaticInfo {
        fn game_info<'a>(&'a self, app_id: &'a str) -> AppInfoFuture<'a> {
            self.lookups.lock().unwrap().push(app_id.to_string());
            Box::pin(async move {
                GameInfo {
                    app_id: app_id.to_string(),
                    name: format!("Game {app_id}"),
                }
            })
        }
    }

    #[test]
    fn format_size_examples() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1024 * 1024 * 5 / 2), "2.50 MB");
        assert_eq!(format_size(1024u64.pow(3)), "1.00 GB");
    }

    #[test]
    fn format_size_stops_at_tb() {
        assert_eq!(format_size(1024u64.pow(5)), "1024.00 TB");
    }

    #[test]
    fn game_path_layout() {
        assert_eq!(
            game_path(Path::new("/games"), "440"),
            PathBuf::from("/games/app_440")
        );
    }

    #[test]
    fn app_dir_name_parsing() {
        assert_eq!(parse_app_dir_name("app_10").as_deref(), Some("10"));
        assert_eq!(parse_app_dir_name("app_"), None);
        assert_eq!(parse_app_dir_name("app_10_old"), None);
        assert_eq!(parse_app_dir_name("foo"), None);
        assert_eq!(parse_app_dir_name("xapp_10"), None);
        // Non-ASCII digits would never pass app id validation.
        assert_eq!(parse_app_dir_name("app_\u{661}\u{662}"), None);
    }

    #[test]
    fn directory_size_sums_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        std::fs::write(tmp.path().join("one"), vec![0u8; 100]).unwrap();
        std::fs::write(tmp.path().join("a/two"), vec![0u8; 200]).unwrap();
        std::fs::write(tmp.path().join("a/b/three"), vec![0u8; 300]).unwrap();

        assert_eq!(get_directory_size(tmp.path()), 600);
    }

    #[test]
    fn directory_size_of_missing_path_is_zero() {
        assert_eq!(get_directory_size(Path::new("/nonexistent/steamshelf")), 0);
    }

    #[tokio::test]
    async fn lists_only_app_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("app_20")).unwrap();
        std::fs::create_dir(tmp.path().join("app_10")).unwrap();
        std::fs::create_dir(tmp.path().join("foo")).unwrap();
        // A plain file with a matching name is not a game.
        std::fs::write(tmp.path().join("app_30"), b"x").unwrap();
        std::fs::write(tmp.path().join("app_10").join("data.bin"), vec![0u8; 1536]).unwrap();

        let info = StaticInfo::default();
        let games = list_installed_games(tmp.path(), &info).await;

        let ids: Vec<&str> = games.iter().map(|g| g.app_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "20"]);

        assert_eq!(games[0].name, "Game 10");
        assert_eq!(games[0].size_bytes, 1536);
        assert_eq!(games[0].size, "1.50 KB");
        assert_eq!(games[1].size, "0 B");
        assert!(games[1].path.ends_with("app_20"));

        assert_eq!(info.lookups.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_games_dir_is_empty() {
        let info = StaticInfo::default();
        let games = list_installed_games(Path::new("/nonexistent/steamshelf"), &info).await;
        assert!(games.is_empty());
    }

    #[tokio::test]
    async fn numeric_ordering() {
        let tmp = tempfile::tempdir().unwrap();
        for id in ["100", "9", "20"] {
            std::fs::create_dir(tmp.path().join(format!("app_{id}"))).unwrap();
        }
        let games = list_installed_games(tmp.path(), &StaticInfo::default()).await;
        let ids: Vec<&str> = games.iter().map(|g| g.app_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "20", "100"]);
    }
}
