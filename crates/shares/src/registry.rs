//! Share creation, deletion and listing.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;
use steamshelf_protocol::ShareRecord;
use steamshelf_protocol::constants::SHARE_ID_LEN;
use tokio::sync::Mutex;

use crate::{ShareError, ShareStore};

/// Owns the shares directory and its database.
///
/// Every operation holds the same lock, so read-modify-write cycles on
/// `shares.json` never interleave within this process. Other processes
/// writing the file concurrently are not coordinated with.
pub struct ShareRegistry {
    shares_dir: PathBuf,
    store: Mutex<ShareStore>,
}

impl ShareRegistry {
    pub fn new(db_file: impl Into<PathBuf>, shares_dir: impl Into<PathBuf>) -> Self {
        Self {
            shares_dir: shares_dir.into(),
            store: Mutex::new(ShareStore::new(db_file)),
        }
    }

    /// Directory holding the share symlinks (the file server root).
    pub fn shares_dir(&self) -> &Path {
        &self.shares_dir
    }

    /// Creates the shares directory and an empty database if missing.
    pub async fn ensure_share_dir(&self) -> Result<(), ShareError> {
        let store = self.store.lock().await;
        self.ensure_locked(&store)
    }

    fn ensure_locked(&self, store: &ShareStore) -> Result<(), ShareError> {
        std::fs::create_dir_all(&self.shares_dir)?;
        store.ensure()
    }

    /// Whether a record with `id` exists. Read errors count as "no".
    pub async fn share_exists(&self, id: &str) -> bool {
        let store = self.store.lock().await;
        match store.load() {
            Ok(shares) => shares.iter().any(|s| s.id == id),
            Err(e) => {
                tracing::debug!("cannot read share database: {e}");
                false
            }
        }
    }

    /// Publishes `game_path` under a fresh share id.
    pub async fn create_share(
        &self,
        game_path: &Path,
        game_name: &str,
        app_id: &str,
    ) -> Result<ShareRecord, ShareError> {
        let store = self.store.lock().await;
        self.ensure_locked(&store)?;

        if !game_path.exists() {
            return Err(ShareError::GameNotFound(game_path.display().to_string()));
        }

        let mut shares = store.load()?;
        let id = generate_share_id(&shares);
        let link = self.shares_dir.join(&id);

        symlink_dir(game_path, &link).map_err(|source| ShareError::Symlink {
            link: link.display().to_string(),
            source,
        })?;

        let record = ShareRecord {
            id,
            game_name: game_name.to_string(),
            app_id: app_id.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            path: link.to_string_lossy().to_string(),
        };
        shares.push(record.clone());

        if let Err(e) = store.save(&shares) {
            // Do not leave an unrecorded link behind.
            let _ = remove_symlink(&link);
            return Err(e);
        }

        tracing::info!(share_id = %record.id, app_id, game_name, "share created");
        Ok(record)
    }

    /// Removes a share and its symlink.
    ///
    /// Returns `false` for unknown ids, leaving the database untouched, and
    /// on any I/O error (logged).
    pub async fn delete_share(&self, id: &str) -> bool {
        let store = self.store.lock().await;

        let shares = match store.load() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to delete share: {e}");
                return false;
            }
        };

        let before = shares.len();
        let remaining: Vec<ShareRecord> = shares.into_iter().filter(|s| s.id != id).collect();
        if remaining.len() == before {
            return false;
        }

        let link = self.shares_dir.join(id);
        let is_link = std::fs::symlink_metadata(&link)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_link {
            if let Err(e) = remove_symlink(&link) {
                tracing::error!("Failed to delete share: {e}");
                return false;
            }
        }

        if let Err(e) = store.save(&remaining) {
            tracing::error!("Failed to delete share: {e}");
            return false;
        }

        tracing::info!(share_id = %id, "share deleted");
        true
    }

    /// Every share in the database, in insertion order.
    pub async fn list_shares(&self) -> Vec<ShareRecord> {
        let store = self.store.lock().await;
        if let Err(e) = self.ensure_locked(&store) {
            tracing::warn!("cannot prepare shares directory: {e}");
        }
        store.load().unwrap_or_else(|e| {
            tracing::error!("Failed to list shares: {e}");
            Vec::new()
        })
    }
}

/// Draws random alphanumeric ids until one is not taken by `existing`.
pub fn generate_share_id(existing: &[ShareRecord]) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(SHARE_ID_LEN)
            .map(char::from)
            .collect();
        if !existing.iter().any(|s| s.id == id) {
            return id;
        }
    }
}

/// URL under which a share is advertised.
pub fn generate_access_url(id: &str, host: &str, port: u16) -> String {
    format!("http://{host}:{port}/share/{id}")
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_symlink(link: &Path) -> std::io::Result<()> {
    std::fs::remove_file(link)
}

#[cfg(windows)]
fn remove_symlink(link: &Path) -> std::io::Result<()> {
    std::fs::remove_dir(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _tmp: tempfile::TempDir,
        registry: ShareRegistry,
        db_file: PathBuf,
        game_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let db_file = tmp.path().join("steamcmd/shares.json");
        let game_dir = tmp.path().join("games/app_70");
        std::fs::create_dir_all(&game_dir).unwrap();
        std::fs::write(game_dir.join("hl.exe"), b"binary").unwrap();

        let registry = ShareRegistry::new(&db_file, tmp.path().join("public_shares"));
        Fixture {
            _tmp: tmp,
            registry,
            db_file,
            game_dir,
        }
    }

    #[test]
    fn share_id_shape() {
        let id = generate_share_id(&[]);
        assert_eq!(id.len(), SHARE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn share_ids_are_unique() {
        let mut existing: Vec<ShareRecord> = Vec::new();
        for _ in 0..200 {
            let id = generate_share_id(&existing);
            assert!(!existing.iter().any(|s| s.id == id));
            existing.push(ShareRecord {
                id,
                game_name: String::new(),
                app_id: String::new(),
                created_at: 0,
                path: String::new(),
            });
        }
    }

    #[test]
    fn access_url_format() {
        assert_eq!(
            generate_access_url("AbCdEf123456", "localhost", 8000),
            "http://localhost:8000/share/AbCdEf123456"
        );
    }

    #[tokio::test]
    async fn ensure_creates_dir_and_db() {
        let f = fixture();
        f.registry.ensure_share_dir().await.unwrap();
        assert!(f.registry.shares_dir().is_dir());
        assert_eq!(std::fs::read_to_string(&f.db_file).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn create_and_delete_share() {
        let f = fixture();
        let record = f
            .registry
            .create_share(&f.game_dir, "Half-Life", "70")
            .await
            .unwrap();

        let link = f.registry.shares_dir().join(&record.id);
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(link.join("hl.exe")).unwrap(), b"binary");
        assert_eq!(record.path, link.to_string_lossy());
        assert!(f.registry.share_exists(&record.id).await);

        let listed = f.registry.list_shares().await;
        assert_eq!(listed, vec![record.clone()]);

        assert!(f.registry.delete_share(&record.id).await);
        assert!(std::fs::symlink_metadata(&link).is_err());
        // The game itself is untouched.
        assert!(f.game_dir.join("hl.exe").exists());
        assert!(f.registry.list_shares().await.is_empty());
        assert!(!f.registry.share_exists(&record.id).await);
    }

    #[tokio::test]
    async fn deleting_unknown_id_leaves_file_untouched() {
        let f = fixture();
        f.registry
            .create_share(&f.game_dir, "Half-Life", "70")
            .await
            .unwrap();
        let before = std::fs::read(&f.db_file).unwrap();

        assert!(!f.registry.delete_share("doesnotexist").await);
        assert_eq!(std::fs::read(&f.db_file).unwrap(), before);
    }

    #[tokio::test]
    async fn create_share_for_missing_game_fails() {
        let f = fixture();
        let err = f
            .registry
            .create_share(&f.game_dir.join("nope"), "Ghost", "1")
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::GameNotFound(_)));
        assert!(f.registry.list_shares().await.is_empty());
    }

    #[tokio::test]
    async fn shares_keep_insertion_order() {
        let f = fixture();
        let a = f.registry.create_share(&f.game_dir, "A", "70").await.unwrap();
        let b = f.registry.create_share(&f.game_dir, "B", "70").await.unwrap();
        assert_ne!(a.id, b.id);

        let ids: Vec<String> = f.registry.list_shares().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn unreadable_db_means_no_shares() {
        let f = fixture();
        f.registry.ensure_share_dir().await.unwrap();
        std::fs::write(&f.db_file, "garbage").unwrap();

        assert!(!f.registry.share_exists("x").await);
        assert!(f.registry.list_shares().await.is_empty());
        assert!(!f.registry.delete_share("x").await);
    }
}
