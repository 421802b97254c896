//! Scanner module for discovering media files in watched directories.
//!
//! Watched directories may already contain media when the daemon starts; the
//! watcher seeds the playlist from a one-level scan before subscribing to
//! file-system events.

use std::path::{Path, PathBuf};

/// Media file extensions recognized by the scanner and the watcher
/// (case-insensitive matching).
pub const MEDIA_EXTENSIONS: &[&str] = &[
    ".mkv", ".mp4", ".avi", ".mov", ".m4v", ".ts", ".m2ts", ".flv", ".webm",
];

/// Checks if a file has a recognized media extension (case-insensitive).
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = format!(".{}", ext.to_lowercase());
            MEDIA_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Collects the media files directly inside `root`, in name order.
///
/// One level deep only, matching what the watcher observes afterwards;
/// subdirectories and unrecognized files are skipped, as is a root that does
/// not exist.
pub fn scan_dir(root: &Path) -> Vec<PathBuf> {
    use walkdir::WalkDir;

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| is_media_file(path))
        .collect();

    files.sort();
    files
}
