pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use types::{
    Credentials, DownloadEntry, DownloadStatus, GameInfo, InstalledGame, ShareRecord,
};
