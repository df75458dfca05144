/// Port of the local control server.
pub const DEFAULT_UI_PORT: u16 = 7860;

/// Port the share file server listens on.
pub const DEFAULT_SHARE_PORT: u16 = 8000;

/// Host used when building share access URLs.
pub const DEFAULT_SHARE_HOST: &str = "localhost";

/// Login used for freely redistributable content.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Length of a generated share id.
pub const SHARE_ID_LEN: usize = 12;

/// Upper bound of the per-download progress counter.
pub const MAX_PROGRESS: u8 = 100;
