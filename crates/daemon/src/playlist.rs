//! Playlist module for the live streamer
//!
//! Ordered list of media sources plus the cursor of the entry being streamed.
//! The structure does no locking of its own; the owning [`Streamer`] serializes
//! access together with the rest of the shared state.
//!
//! [`Streamer`]: crate::streamer::Streamer

use crate::config::SourceItem;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for playlist lookups
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PlaylistError {
    /// No current source exists
    #[error("playlist is empty")]
    Empty,
}

/// What `remove_by_path` removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Index of the removed entry before removal
    pub index: usize,
    /// Whether the removed entry was the cursor's entry
    pub was_current: bool,
}

/// Ordered sequence of sources with a cursor into it.
///
/// Invariant: whenever the list is non-empty, `cursor < len`. While the list
/// is empty the cursor is dormant at 0 and [`current`](Playlist::current) fails.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    items: Vec<SourceItem>,
    cursor: usize,
}

impl Playlist {
    /// Create a playlist seeded with the given sources, cursor on the first.
    pub fn new(items: Vec<SourceItem>) -> Self {
        Self { items, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cursor index, or None while the playlist is empty.
    pub fn cursor(&self) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    /// The entry the cursor points at.
    pub fn current(&self) -> Result<&SourceItem, PlaylistError> {
        self.items.get(self.cursor).ok_or(PlaylistError::Empty)
    }

    /// Add a source to the end. The cursor is untouched.
    pub fn append(&mut self, item: SourceItem) {
        self.items.push(item);
    }

    /// Remove the first entry whose path matches.
    ///
    /// The cursor keeps tracking the entry it pointed at: a removal below it
    /// shifts it down by one, and a cursor left out of range wraps to 0.
    /// Returns None when no entry matches.
    pub fn remove_by_path(&mut self, path: &Path) -> Option<Removal> {
        let index = self.items.iter().position(|item| item.path == path)?;
        let was_current = index == self.cursor;
        self.items.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
        Some(Removal { index, was_current })
    }

    /// Move the cursor forward one entry, wrapping at the end.
    pub fn advance(&mut self) {
        if !self.items.is_empty() {
            self.cursor = (self.cursor + 1) % self.items.len();
        }
    }

    /// Move the cursor back one entry, wrapping at the front.
    pub fn retreat(&mut self) {
        if !self.items.is_empty() {
            self.cursor = (self.cursor + self.items.len() - 1) % self.items.len();
        }
    }

    /// All source paths in streaming order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|item| item.path.clone()).collect()
    }
}
