//! Startup checks module for the live streamer
//!
//! Verifies the external encoder is usable before the daemon starts streaming:
//! the binary must run at all, and its reported version is logged so a field
//! report always names the encoder build involved.

use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("encoder not available: {0}")]
    EncoderUnavailable(String),
}

/// Parse an ffmpeg version banner and extract the major version number
///
/// Handles the common formats:
/// - Standard: "ffmpeg version 6.1.1 ..."
/// - N-prefixed git builds: "ffmpeg version n6.1-... ..."
pub fn parse_encoder_version(version_output: &str) -> Option<u32> {
    // Look for "ffmpeg version" followed by the version string
    let version_line = version_output
        .lines()
        .find(|line| line.to_lowercase().contains("ffmpeg version"))?;

    // Extract the version part after "ffmpeg version"
    let version_part = version_line
        .to_lowercase()
        .split("ffmpeg version")
        .nth(1)?
        .trim()
        .split_whitespace()
        .next()?
        .to_string();

    // Handle n-prefixed versions (e.g., "n6.1-...")
    let version_str = version_part.trim_start_matches('n');

    // Extract major version (before first '.' or '-')
    let major_str = version_str.split(|c| c == '.' || c == '-').next()?;

    major_str.parse().ok()
}

/// Check that the encoder binary can be executed by running `<program> -version`
///
/// The parsed major version, when recognizable, is logged for diagnostics;
/// an unrecognizable banner is not an error as long as the binary ran.
pub fn check_encoder_available(program: &Path) -> Result<(), StartupError> {
    let output = Command::new(program)
        .arg("-version")
        .output()
        .map_err(|e| {
            StartupError::EncoderUnavailable(format!(
                "{} -version failed; is ffmpeg installed and in PATH? Error: {}",
                program.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(StartupError::EncoderUnavailable(format!(
            "{} -version exited with {}",
            program.display(),
            output.status
        )));
    }

    let banner = String::from_utf8_lossy(&output.stdout);
    match parse_encoder_version(&banner) {
        Some(major) => tracing::info!(encoder = %program.display(), major, "encoder available"),
        None => tracing::info!(encoder = %program.display(), "encoder available, unrecognized version banner"),
    }

    Ok(())
}
