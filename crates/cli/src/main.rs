//! CLI entry point for the live streamer daemon
//!
//! Parses command line arguments, wires the streamer to its collaborators
//! (file watcher, status server, interactive command loop), and drives the
//! playback loop until quit.

use clap::Parser;
use live_streamer::{
    check_encoder_available, run_status_server, start_output_trim, start_watcher, Command, Config,
    Streamer,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Live Streamer - loops a playlist of video sources to an RTMP endpoint
#[derive(Parser, Debug)]
#[command(name = "live-streamer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Skip the encoder availability check. For testing only.
    #[arg(long, default_value = "false")]
    skip_checks: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %args.config.display(), error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if args.skip_checks {
        tracing::warn!("skipping encoder availability check (--skip-checks enabled)");
    } else if let Err(e) = check_encoder_available(&config.play.ffmpeg_path) {
        tracing::error!(error = %e, "startup check failed");
        return ExitCode::FAILURE;
    }

    let streamer = Arc::new(Streamer::new(&config));

    if let Err(e) = start_watcher(Arc::clone(&streamer)).await {
        tracing::error!(error = %e, "failed to start file watcher");
        return ExitCode::FAILURE;
    }

    {
        let streamer = Arc::clone(&streamer);
        let addr = config.server.status_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = run_status_server(streamer, &addr).await {
                tracing::error!(error = %e, "status server failed");
            }
        });
    }

    let _trim_task = start_output_trim(streamer.output());

    {
        let streamer = Arc::clone(&streamer);
        tokio::spawn(command_loop(streamer));
    }

    {
        let streamer = Arc::clone(&streamer);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                streamer.close().await;
            }
        });
    }

    streamer.run().await;
    ExitCode::SUCCESS
}

/// Read operator commands from stdin, one per line, until quit or EOF.
///
/// EOF only ends the command loop; the daemon keeps streaming, since stdin
/// may be closed on purpose when running unattended.
async fn command_loop(streamer: Arc<Streamer>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Prev) => streamer.prev().await,
            Ok(Command::Next) => streamer.next().await,
            Ok(Command::Quit) => {
                streamer.close().await;
                break;
            }
            Ok(Command::List) => {
                let paths = streamer.source_paths().await;
                let mut listing = String::from("video list:\n");
                for path in paths {
                    listing.push_str(&format!("  {}\n", path.display()));
                }
                print!("{}", listing);
            }
            Ok(Command::Current) => match streamer.current_path().await {
                Ok(path) => println!("current video: {}", path.display()),
                Err(e) => println!("{}", e),
            },
            Err(e) => println!("{}", e),
        }
    }
}
