//! Process supervisor module for the live streamer
//!
//! Owns the single encoder child process: spawns one invocation per source,
//! pipes its diagnostics into the output sink, and guarantees bounded-time
//! termination on every stop path. At most one child exists at any instant,
//! and nothing outside this module signals or reaps it.

use crate::config::SourceItem;
use crate::encode::{build_ffmpeg_command, EncoderSettings};
use crate::output::OutputSink;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{watch, Mutex};

/// How long a stop request waits for the child before escalating to a kill.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// How one encoder run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited, either on its own or after a stop request.
    Finished,
    /// The child could not be started at all.
    SpawnFailed,
}

/// Handles to the run in flight: a channel to request its termination and a
/// channel that reports when the supervisor is back to idle.
struct ActiveRun {
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

/// Supervises one external encoder invocation at a time.
pub struct ProcessSupervisor {
    settings: EncoderSettings,
    sink: Arc<OutputSink>,
    active: Mutex<Option<ActiveRun>>,
}

impl ProcessSupervisor {
    pub fn new(settings: EncoderSettings, sink: Arc<OutputSink>) -> Self {
        Self {
            settings,
            sink,
            active: Mutex::new(None),
        }
    }

    /// Whether an encoder run is currently in flight.
    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Run the encoder for one source, blocking until the child exits or a
    /// concurrent [`stop`](Self::stop) terminates it.
    ///
    /// Spawn failures are recorded in the sink and reported as
    /// [`RunOutcome::SpawnFailed`] without ever entering the running state;
    /// the caller is expected to delay before retrying.
    pub async fn run(&self, source: &SourceItem) -> RunOutcome {
        let path = source.path.clone();

        let mut cmd = Command::from(build_ffmpeg_command(source, &self.settings));
        cmd.stdin(Stdio::null()).stdout(Stdio::null());
        if self.settings.capture_diagnostics {
            cmd.stderr(Stdio::piped());
        } else {
            // An unread pipe would eventually stall the encoder.
            cmd.stderr(Stdio::null());
        }
        cmd.kill_on_drop(true);

        // Register before spawning, so a stop() issued by an operation that
        // just mutated the playlist cannot miss a child that is still
        // starting up.
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        {
            let mut active = self.active.lock().await;
            *active = Some(ActiveRun { stop_tx, done_rx });
        }

        self.sink
            .write(&format!("start stream: {}\n", path.display()))
            .await;

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.sink
                    .write(&format!(
                        "starting encoder for {} failed: {}\n",
                        path.display(),
                        e
                    ))
                    .await;
                tracing::error!(source = %path.display(), error = %e, "failed to start encoder");
                {
                    let mut active = self.active.lock().await;
                    *active = None;
                }
                let _ = done_tx.send(true);
                return RunOutcome::SpawnFailed;
            }
        };

        tracing::info!(source = %path.display(), "streaming");

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_diagnostics(
                stderr,
                path.clone(),
                Arc::clone(&self.sink),
            ));
        }

        let mut stop_requested = false;
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => {
                    tracing::info!(source = %path.display(), %status, "encoder exited")
                }
                Err(e) => {
                    tracing::warn!(source = %path.display(), error = %e, "failed waiting for encoder")
                }
            },
            _ = stop_rx.changed() => {
                stop_requested = true;
            }
        }

        if stop_requested {
            self.terminate(&mut child, &path).await;
        }

        // Clear the handle before signalling done, so stop() only returns
        // once a new run can no longer race the old child.
        {
            let mut active = self.active.lock().await;
            *active = None;
        }
        let _ = done_tx.send(true);

        self.sink
            .write(&format!("stop stream: {}\n", path.display()))
            .await;

        RunOutcome::Finished
    }

    /// Request the child's termination: ask it to exit, then race its natural
    /// exit against [`STOP_TIMEOUT`] and kill it if it does not comply.
    async fn terminate(&self, child: &mut Child, path: &Path) {
        request_exit(child);
        match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(source = %path.display(), %status, "encoder stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %path.display(), error = %e, "failed waiting for encoder");
            }
            Err(_) => {
                self.sink
                    .write(&format!(
                        "encoder for {} ignored the stop request, killing it\n",
                        path.display()
                    ))
                    .await;
                tracing::warn!(source = %path.display(), "termination timed out, killing encoder");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }

    /// Stop the run in flight, if any, and wait until the supervisor is idle.
    ///
    /// Idempotent; a no-op when nothing is running. The internal lock is held
    /// only to grab the run's channels, never across the wait, so concurrent
    /// state inspection is not blocked for the duration of a slow shutdown.
    pub async fn stop(&self) {
        let done_rx = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(run) => {
                    let _ = run.stop_tx.send(true);
                    Some(run.done_rx.clone())
                }
                None => None,
            }
        };

        let Some(mut done_rx) = done_rx else {
            return;
        };
        while !*done_rx.borrow_and_update() {
            if done_rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Ask the child to exit cooperatively. On unix that is SIGTERM, which the
/// encoder handles by finalizing the outbound stream; elsewhere there is no
/// graceful equivalent and the kill happens up front.
#[cfg(unix)]
fn request_exit(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(error = %e, "failed to signal encoder");
        }
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "failed to kill encoder");
    }
}

/// Drain the encoder's diagnostics into the sink, each chunk prefixed with
/// the source it belongs to. Progress lines are CR-terminated, so this reads
/// raw chunks rather than newline-delimited lines.
async fn read_diagnostics(mut stderr: ChildStderr, source: PathBuf, sink: Arc<OutputSink>) {
    let mut buf = [0u8; 1024];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                sink.write(&format!("[{}] {}", source.display(), chunk))
                    .await;
            }
            Err(e) => {
                sink.write(&format!(
                    "reading encoder output for {} failed: {}\n",
                    source.display(),
                    e
                ))
                .await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayConfig;
    use std::time::Instant;

    fn settings_for(program: PathBuf, capture: bool) -> EncoderSettings {
        EncoderSettings {
            play: PlayConfig {
                ffmpeg_path: program,
                ..PlayConfig::default()
            },
            destination: "rtmp://localhost/live/test".to_string(),
            capture_diagnostics: capture,
        }
    }

    fn supervisor_for(program: PathBuf, capture: bool) -> Arc<ProcessSupervisor> {
        let sink = Arc::new(OutputSink::new(64 * 1024));
        Arc::new(ProcessSupervisor::new(
            settings_for(program, capture),
            sink,
        ))
    }

    /// Write a fake encoder script that ignores its arguments.
    #[cfg(unix)]
    fn fake_encoder(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("fake-encoder.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[tokio::test]
    async fn test_stop_is_noop_when_idle() {
        let supervisor = supervisor_for(PathBuf::from("ffmpeg"), true);
        assert!(!supervisor.is_running().await);
        supervisor.stop().await;
        supervisor.stop().await;
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_recorded_and_returns_immediately() {
        let supervisor = supervisor_for(PathBuf::from("nonexistent-encoder-xyz"), true);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        let outcome = supervisor.run(&source).await;

        assert_eq!(outcome, RunOutcome::SpawnFailed);
        assert!(!supervisor.is_running().await);
        let output = supervisor.sink.snapshot().await;
        assert!(output.contains("starting encoder for /media/a.mp4 failed"));
        // The run never reached the running state, so no stop line either.
        assert!(!output.contains("stop stream"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_natural_exit_returns_finished() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = fake_encoder(&dir, "exit 0");
        let supervisor = supervisor_for(script, false);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        let outcome = supervisor.run(&source).await;

        assert_eq!(outcome, RunOutcome::Finished);
        assert!(!supervisor.is_running().await);
        let output = supervisor.sink.snapshot().await;
        assert!(output.contains("start stream: /media/a.mp4"));
        assert!(output.contains("stop stream: /media/a.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_terminates_long_running_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = fake_encoder(&dir, "exec sleep 30");
        let supervisor = supervisor_for(script, false);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        let runner = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.run(&source).await })
        };

        // Wait for the child to come up.
        let deadline = Instant::now() + Duration::from_secs(5);
        while !supervisor.is_running().await {
            assert!(Instant::now() < deadline, "child never started");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let stop_started = Instant::now();
        supervisor.stop().await;

        // SIGTERM ends the sleep well inside the kill timeout.
        assert!(stop_started.elapsed() < STOP_TIMEOUT);
        assert!(!supervisor.is_running().await);
        assert_eq!(runner.await.expect("runner"), RunOutcome::Finished);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_diagnostics_captured_with_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = fake_encoder(&dir, "echo frame=1 fps=30 >&2");
        let supervisor = supervisor_for(script, true);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        assert_eq!(supervisor.run(&source).await, RunOutcome::Finished);

        // The reader task may still be flushing the last chunk.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let output = supervisor.sink.snapshot().await;
            if output.contains("[/media/a.mp4] frame=1 fps=30") {
                break;
            }
            assert!(Instant::now() < deadline, "diagnostics never captured: {output}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_diagnostics_not_captured_when_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = fake_encoder(&dir, "echo frame=1 fps=30 >&2");
        let supervisor = supervisor_for(script, false);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        assert_eq!(supervisor.run(&source).await, RunOutcome::Finished);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let output = supervisor.sink.snapshot().await;
        assert!(!output.contains("frame=1"));
        assert!(output.contains("start stream: /media/a.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_escalates_to_kill_on_unresponsive_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The child traps SIGTERM so only the kill escalation can end it.
        let script = fake_encoder(&dir, "trap '' TERM\nwhile true; do sleep 1; done");
        let supervisor = supervisor_for(script, false);
        let source = SourceItem::file(PathBuf::from("/media/a.mp4"));

        let runner = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.run(&source).await })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while !supervisor.is_running().await {
            assert!(Instant::now() < deadline, "child never started");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        supervisor.stop().await;

        assert!(!supervisor.is_running().await);
        assert_eq!(runner.await.expect("runner"), RunOutcome::Finished);
        let output = supervisor.sink.snapshot().await;
        assert!(output.contains("ignored the stop request"));
    }
}
