//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// What a playlist entry names: a single media file, or a directory whose
/// contents are watched for media files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Dir,
}

/// One playlist entry: a media source plus optional trim markers.
///
/// `start` and `end` are time offsets in whatever syntax the encoder accepts
/// (for ffmpeg, `HH:MM:SS` or plain seconds); they are passed through verbatim.
/// Entries are matched by `path` when removing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceItem {
    pub path: PathBuf,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub kind: SourceKind,
}

impl SourceItem {
    /// A plain file source with no trim markers, as produced by the watcher.
    pub fn file(path: PathBuf) -> Self {
        Self {
            path,
            start: None,
            end: None,
            kind: SourceKind::File,
        }
    }
}

/// Encoder invocation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayConfig {
    /// Encoder binary (override for tests or nonstandard installs)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_max_rate")]
    pub max_rate: String,
    #[serde(default = "default_buf_size")]
    pub buf_size: String,
    /// Scale filter argument, e.g. "1280:720"
    #[serde(default = "default_scale")]
    pub scale: String,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Extra encoder arguments, split on whitespace and appended verbatim
    #[serde(default)]
    pub custom_args: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_max_rate() -> String {
    "2500k".to_string()
}

fn default_buf_size() -> String {
    "5000k".to_string()
}

fn default_scale() -> String {
    "1280:720".to_string()
}

fn default_frame_rate() -> u32 {
    30
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

fn default_audio_sample_rate() -> u32 {
    44100
}

fn default_output_format() -> String {
    "flv".to_string()
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            max_rate: default_max_rate(),
            buf_size: default_buf_size(),
            scale: default_scale(),
            frame_rate: default_frame_rate(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: default_audio_sample_rate(),
            output_format: default_output_format(),
            custom_args: String::new(),
        }
    }
}

/// Streaming destination configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub rtmp_server: String,
    #[serde(default)]
    pub stream_key: String,
}

impl OutputConfig {
    /// The destination URL handed to the encoder: `<server>/<key>`.
    pub fn destination(&self) -> String {
        format!("{}/{}", self.rtmp_server, self.stream_key)
    }
}

/// Diagnostics capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Capture encoder diagnostics into the output buffer (default true)
    #[serde(default = "default_play_state")]
    pub play_state: bool,
    /// Ceiling for the output buffer, in bytes (default 4 MiB)
    #[serde(default = "default_output_ceiling_bytes")]
    pub output_ceiling_bytes: usize,
}

fn default_play_state() -> bool {
    true
}

fn default_output_ceiling_bytes() -> usize {
    4 * 1024 * 1024
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            play_state: default_play_state(),
            output_ceiling_bytes: default_output_ceiling_bytes(),
        }
    }
}

/// Status server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Bind address for the status HTTP server
    #[serde(default = "default_status_addr")]
    pub status_addr: String,
}

fn default_status_addr() -> String {
    "127.0.0.1:7879".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            status_addr: default_status_addr(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub playlist: Vec<SourceItem>,
    #[serde(default)]
    pub play: PlayConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config.toml file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - OUTPUT_RTMP_SERVER -> output.rtmp_server
    /// - OUTPUT_STREAM_KEY -> output.stream_key
    /// - PLAY_FFMPEG_PATH -> play.ffmpeg_path
    /// - LOG_PLAY_STATE -> log.play_state
    /// - LOG_OUTPUT_CEILING_BYTES -> log.output_ceiling_bytes
    pub fn apply_env_overrides(&mut self) {
        // OUTPUT_RTMP_SERVER
        if let Ok(val) = env::var("OUTPUT_RTMP_SERVER") {
            if !val.is_empty() {
                self.output.rtmp_server = val;
            }
        }

        // OUTPUT_STREAM_KEY
        if let Ok(val) = env::var("OUTPUT_STREAM_KEY") {
            if !val.is_empty() {
                self.output.stream_key = val;
            }
        }

        // PLAY_FFMPEG_PATH
        if let Ok(val) = env::var("PLAY_FFMPEG_PATH") {
            if !val.is_empty() {
                self.play.ffmpeg_path = PathBuf::from(val);
            }
        }

        // LOG_PLAY_STATE
        if let Ok(val) = env::var("LOG_PLAY_STATE") {
            // Accept "true", "1", "yes" as true; "false", "0", "no" as false
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.log.play_state = true,
                "false" | "0" | "no" => self.log.play_state = false,
                _ => {} // Invalid value, keep existing
            }
        }

        // LOG_OUTPUT_CEILING_BYTES
        if let Ok(val) = env::var("LOG_OUTPUT_CEILING_BYTES") {
            if let Ok(bytes) = val.parse::<usize>() {
                self.log.output_ceiling_bytes = bytes;
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }
}
