//! Streamer module for the live streamer
//!
//! The coordination layer: owns the playlist and the manual-control flag
//! behind one lock, drives the supervisor from a long-lived loop, and exposes
//! the operations the command loop, the watcher, and the status server call
//! into concurrently. Constructed once at startup and passed around as an
//! `Arc`; there is no process-wide instance.

use crate::config::{Config, SourceItem, SourceKind};
use crate::encode::EncoderSettings;
use crate::output::OutputSink;
use crate::playlist::{Playlist, PlaylistError};
use crate::status::StatusSnapshot;
use crate::supervisor::{ProcessSupervisor, RunOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// How long the loop dozes between probes while the playlist is empty.
const EMPTY_PLAYLIST_WAIT: Duration = Duration::from_secs(1);

/// Backoff window for encoder spawn failures. Doubles from the initial delay
/// up to the cap and resets on the next successful spawn, so a missing binary
/// or a broken source never turns the loop into a busy spin.
const SPAWN_RETRY_INITIAL: Duration = Duration::from_secs(1);
const SPAWN_RETRY_CAP: Duration = Duration::from_secs(30);

/// Shared mutable state, everything behind the one lock.
struct State {
    playlist: Playlist,
    /// True while the next process termination is operator-requested and the
    /// auto-advance rule must be suppressed exactly once.
    manual_control: bool,
}

/// Plays the playlist forever, one encoder run at a time.
pub struct Streamer {
    state: Mutex<State>,
    supervisor: Arc<ProcessSupervisor>,
    sink: Arc<OutputSink>,
    watch_roots: Vec<PathBuf>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Streamer {
    /// Build a streamer from configuration.
    ///
    /// File entries seed the playlist; directory entries become watch roots
    /// and are never handed to the encoder.
    pub fn new(cfg: &Config) -> Self {
        let sink = Arc::new(OutputSink::new(cfg.log.output_ceiling_bytes));
        let supervisor = Arc::new(ProcessSupervisor::new(
            EncoderSettings::from_config(cfg),
            Arc::clone(&sink),
        ));

        let items: Vec<SourceItem> = cfg
            .playlist
            .iter()
            .filter(|item| item.kind == SourceKind::File)
            .cloned()
            .collect();
        let watch_roots = cfg
            .playlist
            .iter()
            .filter(|item| item.kind == SourceKind::Dir)
            .map(|item| item.path.clone())
            .collect();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            state: Mutex::new(State {
                playlist: Playlist::new(items),
                manual_control: false,
            }),
            supervisor,
            sink,
            watch_roots,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Drive the playlist until [`close`](Self::close) is called.
    ///
    /// Each iteration streams the cursor's source to completion, then either
    /// consumes a pending manual skip (which already moved the cursor) or
    /// auto-advances. An empty playlist and a failed spawn both wait instead
    /// of spinning.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut spawn_retry = SPAWN_RETRY_INITIAL;

        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            let source = {
                let state = self.state.lock().await;
                state.playlist.current().cloned()
            };
            let source = match source {
                Ok(source) => source,
                Err(PlaylistError::Empty) => {
                    self.wait_or_shutdown(EMPTY_PLAYLIST_WAIT, &mut shutdown_rx)
                        .await;
                    continue;
                }
            };

            match self.supervisor.run(&source).await {
                RunOutcome::SpawnFailed => {
                    tracing::warn!(
                        source = %source.path.display(),
                        delay = ?spawn_retry,
                        "encoder failed to start, delaying retry"
                    );
                    self.wait_or_shutdown(spawn_retry, &mut shutdown_rx).await;
                    spawn_retry = (spawn_retry * 2).min(SPAWN_RETRY_CAP);
                }
                RunOutcome::Finished => {
                    spawn_retry = SPAWN_RETRY_INITIAL;
                    let mut state = self.state.lock().await;
                    if state.manual_control {
                        // The skip already moved the cursor before stopping.
                        state.manual_control = false;
                    } else {
                        state.playlist.advance();
                    }
                }
            }
        }

        self.supervisor.stop().await;
    }

    async fn wait_or_shutdown(&self, delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {}
        }
    }

    /// Skip forward to the next source.
    pub async fn next(&self) {
        {
            let mut state = self.state.lock().await;
            if state.playlist.is_empty() {
                return;
            }
            state.manual_control = true;
            state.playlist.advance();
        }
        self.supervisor.stop().await;
    }

    /// Skip back to the previous source.
    pub async fn prev(&self) {
        {
            let mut state = self.state.lock().await;
            if state.playlist.is_empty() {
                return;
            }
            state.manual_control = true;
            state.playlist.retreat();
        }
        self.supervisor.stop().await;
    }

    /// Append a newly discovered file to the playlist.
    pub async fn add(&self, path: PathBuf) {
        let mut state = self.state.lock().await;
        state.playlist.append(SourceItem::file(path));
    }

    /// Remove the first entry matching `path`. When that entry is the one
    /// being streamed, the run is interrupted; the manual flag stays clear, so
    /// the normal auto-advance applies afterwards. Returns whether anything
    /// was removed.
    pub async fn remove(&self, path: &Path) -> bool {
        let removal = {
            let mut state = self.state.lock().await;
            state.playlist.remove_by_path(path)
        };
        match removal {
            Some(removal) => {
                if removal.was_current {
                    self.supervisor.stop().await;
                }
                true
            }
            None => false,
        }
    }

    /// Stop streaming and make the driving loop exit. Terminal.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        self.supervisor.stop().await;
    }

    /// All source paths in loop order.
    pub async fn source_paths(&self) -> Vec<PathBuf> {
        self.state.lock().await.playlist.paths()
    }

    /// Path of the cursor's source.
    pub async fn current_path(&self) -> Result<PathBuf, PlaylistError> {
        let state = self.state.lock().await;
        state.playlist.current().map(|item| item.path.clone())
    }

    /// Whether an encoder run is in flight.
    pub async fn is_streaming(&self) -> bool {
        self.supervisor.is_running().await
    }

    /// Directories the file watcher should monitor.
    pub fn watch_roots(&self) -> &[PathBuf] {
        &self.watch_roots
    }

    /// The shared output sink.
    pub fn output(&self) -> Arc<OutputSink> {
        Arc::clone(&self.sink)
    }

    /// Snapshot for the status endpoint.
    pub async fn status(&self) -> StatusSnapshot {
        let (sources, current_index, current_path) = {
            let state = self.state.lock().await;
            let sources = state
                .playlist
                .paths()
                .iter()
                .map(|path| path.display().to_string())
                .collect();
            let current_index = state.playlist.cursor();
            let current_path = state
                .playlist
                .current()
                .ok()
                .map(|item| item.path.display().to_string());
            (sources, current_index, current_path)
        };

        StatusSnapshot {
            sources,
            current_index,
            current_path,
            streaming: self.supervisor.is_running().await,
            output_bytes: self.sink.len().await,
        }
    }
}
