//! Game shares: symlinks under a public directory plus a JSON database.
//!
//! A share is a random 12-character id. `<shares_dir>/<id>` is a directory
//! symlink to the installed game, and the record lives in `shares.json`.

pub mod error;
pub mod registry;
pub mod store;

pub use error::ShareError;
pub use registry::{ShareRegistry, generate_access_url, generate_share_id};
pub use store::ShareStore;
