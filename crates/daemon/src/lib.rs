//! Live Streamer
//!
//! Long-running service that streams a playlist of video sources to an RTMP
//! endpoint by supervising one external encoder process at a time.

pub mod command;
pub mod encode;
pub mod output;
pub mod playlist;
pub mod scan;
pub mod startup;
pub mod status;
pub mod streamer;
pub mod supervisor;
pub mod watcher;

pub use live_streamer_config as config;
pub use live_streamer_config::Config;

pub use command::{Command, CommandError};
pub use encode::{build_ffmpeg_command, EncoderSettings};
pub use output::OutputSink;
pub use playlist::{Playlist, PlaylistError, Removal};
pub use scan::{is_media_file, scan_dir, MEDIA_EXTENSIONS};
pub use startup::{check_encoder_available, parse_encoder_version, StartupError};
pub use status::{
    create_status_router, run_status_server, start_output_trim, ServerError, StatusSnapshot,
};
pub use streamer::Streamer;
pub use supervisor::{ProcessSupervisor, RunOutcome};
pub use watcher::{start_watcher, WatchError};
