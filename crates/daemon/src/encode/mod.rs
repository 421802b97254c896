//! Encoder invocation modules for the live streamer

pub mod ffmpeg;

pub use ffmpeg::{build_ffmpeg_command, EncoderSettings};
