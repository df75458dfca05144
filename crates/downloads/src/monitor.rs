//! Per-download monitor task.

use std::sync::Arc;

use steamshelf_protocol::{DownloadEntry, DownloadStatus};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::registry::RegistryState;

/// What a single output line means for the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Plain output: only advances the counter.
    Output,
    /// The line contains `Error`.
    Error,
    /// The line contains `Success`.
    Success,
}

/// Classifies one line of steamcmd output.
///
/// Case-sensitive substring match anywhere in the line, `Error` taking
/// precedence. A game name containing either word is a false positive.
pub fn classify_line(line: &str) -> LineEvent {
    if line.contains("Error") {
        LineEvent::Error
    } else if line.contains("Success") {
        LineEvent::Success
    } else {
        LineEvent::Output
    }
}

/// Applies a line to an entry: +1 progress, then the status flip.
pub(crate) fn apply_event(entry: &mut DownloadEntry, event: LineEvent) {
    entry.bump_progress();
    match event {
        LineEvent::Output => {}
        LineEvent::Error => entry.status = DownloadStatus::Error,
        LineEvent::Success => {
            entry.status = DownloadStatus::Completed;
            entry.progress = steamshelf_protocol::constants::MAX_PROGRESS;
        }
    }
}

enum Step {
    Line(String),
    Eof,
    Cancelled,
}

/// Runs until the child's output is exhausted and it has exited, or until
/// `cancel` fires.
pub(crate) async fn run(
    id: String,
    mut child: Child,
    cancel: CancellationToken,
    state: Arc<Mutex<RegistryState>>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx.clone());
    }
    drop(tx);

    loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => Step::Cancelled,
            line = rx.recv() => line.map_or(Step::Eof, Step::Line),
        };

        match step {
            Step::Line(line) => {
                tracing::debug!(download_id = %id, "steamcmd: {line}");
                let event = classify_line(&line);
                let mut st = state.lock().await;
                if let Some(entry) = st.entries.get_mut(&id) {
                    apply_event(entry, event);
                }
            }
            Step::Eof => break,
            Step::Cancelled => {
                finish_cancelled(&id, &mut child, &state).await;
                return;
            }
        }
    }

    // Both pipes are closed; the process may still be winding down.
    let cancelled = tokio::select! {
        _ = cancel.cancelled() => true,
        status = child.wait() => {
            match status {
                Ok(s) => tracing::info!(download_id = %id, status = %s, "steamcmd exited"),
                Err(e) => tracing::warn!(download_id = %id, "failed to wait for steamcmd: {e}"),
            }
            false
        }
    };
    if cancelled {
        finish_cancelled(&id, &mut child, &state).await;
        return;
    }

    let mut st = state.lock().await;
    if let Some(entry) = st.entries.get_mut(&id) {
        if entry.status == DownloadStatus::Starting {
            entry.status = DownloadStatus::Finished;
        }
        tracing::info!(
            download_id = %id,
            app_id = %entry.app_id,
            status = %entry.status,
            progress = entry.progress,
            "download monitor finished"
        );
    }
}

async fn finish_cancelled(id: &str, child: &mut Child, state: &Mutex<RegistryState>) {
    let stopped = steamshelf_steamcmd::cancel_download(child).await;
    let mut st = state.lock().await;
    if let Some(entry) = st.entries.get_mut(id) {
        if !entry.is_terminal() {
            entry.status = DownloadStatus::Cancelled;
        }
    }
    tracing::info!(download_id = %id, stopped, "download cancelled");
}

fn spawn_line_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}
