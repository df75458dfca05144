//! App metadata lookup via `+app_info_print`.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use steamshelf_protocol::GameInfo;
use steamshelf_protocol::constants::ANONYMOUS_USER;
use tokio::process::Command;

use crate::SteamCmd;

/// Boxed future returned by [`AppInfoProvider::game_info`].
pub type AppInfoFuture<'a> = Pin<Box<dyn Future<Output = GameInfo> + Send + 'a>>;

/// Source of game metadata.
///
/// [`SteamCmd`] implements it by shelling out; the library scan only
/// needs something that turns an app id into a name.
pub trait AppInfoProvider: Send + Sync {
    /// Looks up a game. Never fails: unknown games get a placeholder name.
    fn game_info<'a>(&'a self, app_id: &'a str) -> AppInfoFuture<'a>;
}

impl AppInfoProvider for SteamCmd {
    fn game_info<'a>(&'a self, app_id: &'a str) -> AppInfoFuture<'a> {
        Box::pin(self.get_game_info(app_id))
    }
}

impl SteamCmd {
    /// Runs `+app_info_print` anonymously and extracts the display name.
    ///
    /// Spawn errors, non-zero exits and unparseable output all degrade to
    /// [`GameInfo::unknown`]; the cause is logged.
    pub async fn get_game_info(&self, app_id: &str) -> GameInfo {
        let mut cmd = Command::new(self.launcher_path());
        cmd.args(["+login", ANONYMOUS_USER, "+app_info_print", app_id, "+quit"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match crate::spawn_retrying(&mut cmd).await {
            Ok(child) => child.wait_with_output().await,
            Err(e) => Err(e),
        };

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(app_id, "Failed to get game info: {e}");
                return GameInfo::unknown(app_id);
            }
        };

        if !output.status.success() {
            tracing::error!(app_id, status = %output.status, "Failed to get game info");
            return GameInfo::unknown(app_id);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_app_name(&stdout) {
            Some(name) => GameInfo {
                app_id: app_id.to_string(),
                name,
            },
            None => {
                tracing::debug!(app_id, "no name found in app_info_print output");
                GameInfo::unknown(app_id)
            }
        }
    }
}

/// Extracts the `name` key of the first `"common"` block.
///
/// Only looks as far as the first closing brace after `"common"`, so a
/// name that follows a nested block is missed.
pub fn parse_app_name(output: &str) -> Option<String> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| {
        Regex::new(r#""common"\s*\{[^}]*"name"\s*"([^"]*)""#).expect("valid app name regex")
    });

    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TF2_INFO: &str = r#"
AppID : 440, change number : 24312043/0, last change : Mon Jun  3 17:23:45 2024
"440"
{
	"appid"		"440"
	"common"
	{
		"name"		"Team Fortress 2"
		"type"		"Game"
		"oslist"		"windows,macos,linux"
	}
}
"#;

    #[test]
    fn parses_name_from_common_block() {
        assert_eq!(parse_app_name(TF2_INFO).as_deref(), Some("Team Fortress 2"));
    }

    #[test]
    fn ignores_name_outside_common() {
        let text = r#""extended" { "name" "Not This" }"#;
        assert_eq!(parse_app_name(text), None);
    }

    #[test]
    fn name_after_nested_block_is_missed() {
        let text = r#""common" { "associations" { "0" "x" } "name" "Late" }"#;
        assert_eq!(parse_app_name(text), None);
    }

    #[test]
    fn empty_output() {
        assert_eq!(parse_app_name(""), None);
    }

    #[tokio::test]
    async fn missing_launcher_gives_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let sc = SteamCmd::new(tmp.path());
        let info = sc.get_game_info("70").await;
        assert_eq!(info, GameInfo::unknown("70"));
    }

    #[cfg(unix)]
    fn fake_launcher(dir: &std::path::Path, body: &str) -> SteamCmd {
        use std::os::unix::fs::PermissionsExt;

        let sc = SteamCmd::new(dir);
        std::fs::write(sc.launcher_path(), format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(sc.launcher_path(), std::fs::Permissions::from_mode(0o755))
            .unwrap();
        sc
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_name_from_launcher_output() {
        let tmp = tempfile::tempdir().unwrap();
        let sc = fake_launcher(
            tmp.path(),
            "printf '\"common\"\\n{\\n\\t\"name\"\\t\\t\"Portal\"\\n}\\n'",
        );
        let info = sc.game_info("400").await;
        assert_eq!(info.name, "Portal");
        assert_eq!(info.app_id, "400");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_launcher_gives_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let sc = fake_launcher(tmp.path(), "echo '\"common\" { \"name\" \"X\" }'; exit 5");
        let info = sc.get_game_info("400").await;
        assert_eq!(info, GameInfo::unknown("400"));
    }
}
