//! FFmpeg invocation builder for the live streamer
//!
//! Constructs the encoder command line for one playlist source: realtime
//! pacing, optional trim markers around the input, the configured output
//! encoding parameters, diagnostics flags, operator extras, and finally the
//! stream destination. Argument order matters to the encoder and is part of
//! the contract.

use crate::config::{Config, PlayConfig, SourceItem};
use std::process::Command;

/// Everything the supervisor needs to start one encoder run.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Encoder output parameters and binary path
    pub play: PlayConfig,
    /// Destination URL, `<server>/<key>`
    pub destination: String,
    /// Whether encoder diagnostics are captured into the output sink
    pub capture_diagnostics: bool,
}

impl EncoderSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            play: cfg.play.clone(),
            destination: cfg.output.destination(),
            capture_diagnostics: cfg.log.play_state,
        }
    }
}

/// Build the encoder command for one source.
///
/// Layout: `-re`, `-ss <start>` when set, the input, `-to <end>` when set,
/// the fixed output parameters, `-stats -loglevel info`, any operator
/// `custom_args` split on whitespace, and the destination last.
pub fn build_ffmpeg_command(source: &SourceItem, settings: &EncoderSettings) -> Command {
    let play = &settings.play;
    let mut cmd = Command::new(&play.ffmpeg_path);

    // Realtime pacing so the encoder feeds the stream at playback speed.
    cmd.arg("-re");

    if let Some(start) = &source.start {
        cmd.arg("-ss").arg(start);
    }

    cmd.arg("-i").arg(&source.path);

    if let Some(end) = &source.end {
        cmd.arg("-to").arg(end);
    }

    cmd.arg("-c:v").arg(&play.video_codec);
    cmd.arg("-preset").arg(&play.preset);
    cmd.arg("-crf").arg(play.crf.to_string());
    cmd.arg("-maxrate").arg(&play.max_rate);
    cmd.arg("-bufsize").arg(&play.buf_size);
    cmd.arg("-vf").arg(format!("scale={}", play.scale));
    cmd.arg("-r").arg(play.frame_rate.to_string());
    cmd.arg("-c:a").arg(&play.audio_codec);
    cmd.arg("-b:a").arg(&play.audio_bitrate);
    cmd.arg("-ar").arg(play.audio_sample_rate.to_string());
    cmd.arg("-f").arg(&play.output_format);
    cmd.arg("-stats").arg("-loglevel").arg("info");

    for extra in play.custom_args.split_whitespace() {
        cmd.arg(extra);
    }

    cmd.arg(&settings.destination);

    cmd
}
