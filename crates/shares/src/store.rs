//! `shares.json` persistence.

use std::path::{Path, PathBuf};

use steamshelf_protocol::ShareRecord;

use crate::ShareError;

/// The share database file: a JSON array of [`ShareRecord`].
#[derive(Debug, Clone)]
pub struct ShareStore {
    path: PathBuf,
}

impl ShareStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty `[]` file if missing.
    pub fn ensure(&self) -> Result<(), ShareError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.save(&[])
    }

    /// Reads every record. A missing file is an empty database.
    pub fn load(&self) -> Result<Vec<ShareRecord>, ShareError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Replaces the file contents.
    ///
    /// Writes a sibling `.tmp` file and renames it over the target, so a
    /// crash never leaves a truncated database behind.
    pub fn save(&self, shares: &[ShareRecord]) -> Result<(), ShareError> {
        let text = serde_json::to_string_pretty(shares)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
