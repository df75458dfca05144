//! The download registry: one owner for all download state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use steamshelf_protocol::DownloadEntry;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::monitor;

/// Tracks downloads and their monitor tasks.
///
/// Entries live only in memory. Readers get cloned snapshots; only the
/// monitor tasks and the registry methods mutate state.
pub struct DownloadRegistry {
    inner: Arc<Mutex<RegistryState>>,
    /// Root token; every monitor token is a child of it.
    cancel: CancellationToken,
}

pub(crate) struct RegistryState {
    pub(crate) entries: HashMap<String, DownloadEntry>,
    monitors: HashMap<String, Monitor>,
    /// Last id handed out (microseconds since the epoch).
    last_id: i64,
}

struct Monitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                entries: HashMap::new(),
                monitors: HashMap::new(),
                last_id: 0,
            })),
            cancel: CancellationToken::new(),
        }
    }

    /// Registers a freshly spawned steamcmd process and starts monitoring it.
    ///
    /// Takes ownership of the child. Returns the download id.
    pub async fn track(&self, app_id: &str, game_name: &str, child: Child) -> String {
        let mut state = self.inner.lock().await;

        let id = state.next_id();
        state.entries.insert(
            id.clone(),
            DownloadEntry::new(id.clone(), app_id.to_string(), game_name.to_string()),
        );

        let cancel = self.cancel.child_token();
        let task = tokio::spawn(monitor::run(
            id.clone(),
            child,
            cancel.clone(),
            Arc::clone(&self.inner),
        ));
        state.monitors.insert(id.clone(), Monitor { cancel, task });

        tracing::info!(download_id = %id, app_id, game_name, "tracking download");
        id
    }

    /// Returns a copy of every entry, oldest first.
    pub async fn snapshot(&self) -> Vec<DownloadEntry> {
        let state = self.inner.lock().await;
        let mut entries: Vec<DownloadEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    /// Returns a copy of one entry.
    pub async fn get(&self, id: &str) -> Option<DownloadEntry> {
        self.inner.lock().await.entries.get(id).cloned()
    }

    /// Number of downloads whose process is still being monitored.
    pub async fn active_count(&self) -> usize {
        let state = self.inner.lock().await;
        state
            .entries
            .iter()
            .filter(|(id, e)| !e.is_terminal() || state.is_monitored(id))
            .count()
    }

    /// Asks the monitor of `id` to stop its process.
    ///
    /// Returns `false` for unknown ids and once the monitor has exited. A
    /// download that already printed `Error` or `Success` can still be
    /// cancelled while steamcmd is running; its status is kept.
    pub async fn cancel(&self, id: &str) -> bool {
        let state = self.inner.lock().await;
        match state.monitors.get(id) {
            Some(m) if !m.task.is_finished() && !m.cancel.is_cancelled() => {
                m.cancel.cancel();
                tracing::info!(download_id = %id, "cancel requested");
                true
            }
            _ => false,
        }
    }

    /// Drops a finished entry from the table.
    ///
    /// Refused while the monitor still owns a live process, whatever the
    /// status says; cancel it first.
    pub async fn remove(&self, id: &str) -> bool {
        let mut state = self.inner.lock().await;
        let removable = state.entries.get(id).is_some_and(|e| e.is_terminal())
            && !state.is_monitored(id);
        if removable {
            state.entries.remove(id);
            state.monitors.remove(id);
        }
        removable
    }

    /// Waits for the monitor of `id` to finish and returns the final entry.
    ///
    /// For callers that need the outcome of one download rather than
    /// polling [`snapshot`](Self::snapshot). Does not cancel anything; pair
    /// it with [`cancel`](Self::cancel) to stop and reap a download.
    pub async fn wait(&self, id: &str) -> Option<DownloadEntry> {
        let monitor = self.inner.lock().await.monitors.remove(id);
        if let Some(m) = monitor {
            if let Err(e) = m.task.await {
                tracing::error!(download_id = %id, "monitor task failed: {e}");
            }
        }
        self.get(id).await
    }

    /// Cancels every monitor and waits for all of them to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let monitors: Vec<(String, Monitor)> = {
            let mut state = self.inner.lock().await;
            state.monitors.drain().collect()
        };

        let count = monitors.len();
        for (id, m) in monitors {
            if let Err(e) = m.task.await {
                tracing::error!(download_id = %id, "monitor task failed: {e}");
            }
        }
        tracing::info!(count, "download monitors stopped");
    }
}

impl RegistryState {
    /// Whether a monitor task for `id` is still running.
    fn is_monitored(&self, id: &str) -> bool {
        self.monitors.get(id).is_some_and(|m| !m.task.is_finished())
    }

    /// Timestamp-derived id, bumped past the previous one on collision.
    fn next_id(&mut self) -> String {
        let mut id = Utc::now().timestamp_micros();
        if id <= self.last_id {
            id = self.last_id + 1;
        }
        self.last_id = id;
        id.to_string()
    }
}
