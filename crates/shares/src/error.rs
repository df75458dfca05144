//! Error types for the share registry.

/// Errors produced while creating or persisting shares.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid share database: {0}")]
    Json(#[from] serde_json::Error),

    #[error("game path does not exist: {0}")]
    GameNotFound(String),

    #[error("failed to create symlink {link}: {source}")]
    Symlink {
        link: String,
        #[source]
        source: std::io::Error,
    },
}
