//! Output sink module for the live streamer
//!
//! Append-only text log of supervisor and encoder activity, bounded by a
//! configured byte ceiling. Writers are the supervisor and the per-run
//! diagnostics reader; readers are the status endpoints.

use tokio::sync::Mutex;

/// Append-only, size-bounded text accumulator.
pub struct OutputSink {
    ceiling: usize,
    buf: Mutex<String>,
}

impl OutputSink {
    /// Create a sink that `truncate` bounds to `ceiling` bytes.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            buf: Mutex::new(String::new()),
        }
    }

    /// Append text to the log.
    pub async fn write(&self, text: &str) {
        let mut buf = self.buf.lock().await;
        buf.push_str(text);
    }

    /// Current contents.
    pub async fn snapshot(&self) -> String {
        self.buf.lock().await.clone()
    }

    /// Current size in bytes.
    pub async fn len(&self) -> usize {
        self.buf.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buf.lock().await.is_empty()
    }

    /// Drop everything but the trailing `ceiling` bytes when the buffer has
    /// outgrown the ceiling, returning the size *before* truncation so callers
    /// can tell whether anything was dropped. Below the ceiling this is a no-op.
    pub async fn truncate(&self) -> usize {
        let mut buf = self.buf.lock().await;
        let before = buf.len();
        if before > self.ceiling {
            let mut start = before - self.ceiling;
            // The cut may land inside a multi-byte sequence.
            while !buf.is_char_boundary(start) {
                start += 1;
            }
            buf.replace_range(..start, "");
        }
        before
    }
}
