//! File watcher module for the live streamer
//!
//! Monitors the configured watch directories so the playlist follows the
//! file system: a newly created media file is appended, a removed file is
//! taken out of rotation (interrupting its stream if it was playing).

use crate::scan::{is_media_file, scan_dir};
use crate::streamer::Streamer;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Error type for watcher startup
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Start watching the streamer's watch roots.
///
/// Existing media files in each root are appended to the playlist first, then
/// a non-recursive watcher keeps it current. Returns `None` when there is
/// nothing to watch. The returned task owns the watcher and runs until the
/// event channel closes.
pub async fn start_watcher(streamer: Arc<Streamer>) -> Result<Option<JoinHandle<()>>, WatchError> {
    let roots = streamer.watch_roots().to_vec();
    if roots.is_empty() {
        return Ok(None);
    }

    for root in &roots {
        for path in scan_dir(root) {
            tracing::info!(path = %path.display(), "queueing existing file");
            streamer.add(path).await;
        }
    }

    let (event_tx, mut event_rx) = mpsc::channel::<Event>(100);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let _ = event_tx.blocking_send(event);
            }
            Err(e) => tracing::warn!(error = %e, "watcher error"),
        },
        notify::Config::default(),
    )
    .map_err(WatchError::Create)?;

    for root in &roots {
        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Watch {
                path: root.clone(),
                source: e,
            })?;
        tracing::info!(dir = %root.display(), "watching directory");
    }

    let handle = tokio::spawn(async move {
        // The watcher stops when dropped, so it lives inside the task.
        let _watcher = watcher;
        while let Some(event) = event_rx.recv().await {
            handle_event(&streamer, event).await;
        }
    });

    Ok(Some(handle))
}

/// Apply one file-system event to the playlist.
///
/// Creations are filtered to recognized media files; removals are honored for
/// any path, since the file is gone no matter what it was called.
async fn handle_event(streamer: &Streamer, event: Event) {
    match event.kind {
        EventKind::Create(_) => {
            for path in event.paths {
                if is_media_file(&path) {
                    tracing::info!(path = %path.display(), "new source discovered");
                    streamer.add(path).await;
                }
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                tracing::info!(path = %path.display(), "source removed");
                streamer.remove(&path).await;
            }
        }
        _ => {}
    }
}
