fn main() {
    println!("Run `cargo test -p share-db-compat` to execute share database compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use steamshelf_protocol::ShareRecord;
    use steamshelf_protocol::messages::StartDownloadRequest;
    use steamshelf_shares::{ShareRegistry, ShareStore};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Copies a fixture into a scratch directory so tests can mutate it.
    fn scratch_copy(name: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(name);
        fs::write(&path, read_fixture(name)).unwrap();
        (tmp, path)
    }

    #[test]
    fn legacy_shares_file_parses() {
        let shares: Vec<ShareRecord> = serde_json::from_str(&read_fixture("shares.json")).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].id, "Qm7xT2pLk9Za");
        assert_eq!(shares[0].game_name, "Half-Life");
        assert_eq!(shares[0].app_id, "70");
        assert_eq!(shares[0].created_at, 1_718_035_200);
        assert_eq!(shares[1].path, "/home/deck/public_shares/b4R8nW1cYe0J");
    }

    #[test]
    fn rewritten_file_keeps_field_names() {
        let (_tmp, path) = scratch_copy("shares.json");
        let store = ShareStore::new(&path);
        let shares = store.load().unwrap();
        store.save(&shares).unwrap();

        let original: serde_json::Value = serde_json::from_str(&read_fixture("shares.json")).unwrap();
        let rewritten: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(original, rewritten);
    }

    #[tokio::test]
    async fn registry_reads_legacy_file() {
        let (tmp, path) = scratch_copy("shares.json");
        let registry = ShareRegistry::new(&path, tmp.path().join("public_shares"));

        let ids: Vec<String> = registry.list_shares().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["Qm7xT2pLk9Za", "b4R8nW1cYe0J"]);
        assert!(registry.share_exists("b4R8nW1cYe0J").await);
    }

    #[tokio::test]
    async fn deleting_unknown_id_keeps_legacy_bytes() {
        let (tmp, path) = scratch_copy("shares.json");
        let registry = ShareRegistry::new(&path, tmp.path().join("public_shares"));
        let before = fs::read(&path).unwrap();

        assert!(!registry.delete_share("zzzzzzzzzzzz").await);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn deleting_known_id_without_symlink() {
        // The symlink may already be gone; the record is still dropped.
        let (tmp, path) = scratch_copy("shares.json");
        let registry = ShareRegistry::new(&path, tmp.path().join("public_shares"));

        assert!(registry.delete_share("Qm7xT2pLk9Za").await);
        let remaining = ShareStore::new(&path).load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b4R8nW1cYe0J");
    }

    #[test]
    fn start_download_payload() {
        let req: StartDownloadRequest =
            serde_json::from_str(&read_fixture("start_download.json")).unwrap();
        assert_eq!(req.app_id, "440");
        assert!(!req.anonymous);
        let creds = req.credentials();
        assert_eq!(creds.username, "deckuser");
        assert_eq!(creds.password, "hunter2");
    }
}
