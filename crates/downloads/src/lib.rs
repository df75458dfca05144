//! Download bookkeeping.
//!
//! A [`DownloadRegistry`] owns every download started in this process. Each
//! download gets one monitor task that reads the steamcmd output line by
//! line, bumps a progress counter per line and flips the status when a
//! line mentions `Error` or `Success`. The UI only ever sees snapshots.

mod monitor;
mod registry;

pub use monitor::{LineEvent, classify_line};
pub use registry::DownloadRegistry;
