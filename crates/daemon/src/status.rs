//! Status HTTP server for the live streamer
//!
//! Exposes the playlist state and the captured encoder output for inspection,
//! and runs the periodic trim that keeps the output buffer bounded.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::output::OutputSink;
use crate::streamer::Streamer;

/// How often the output buffer is checked against its ceiling.
const OUTPUT_TRIM_INTERVAL: Duration = Duration::from_secs(30);

/// Errors that can occur when running the status server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid status server address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),
}

/// Point-in-time view of the streamer for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Source paths in loop order
    pub sources: Vec<String>,
    /// Cursor index, absent while the playlist is empty
    pub current_index: Option<usize>,
    /// Path of the cursor's source, absent while the playlist is empty
    pub current_path: Option<String>,
    /// Whether an encoder run is in flight
    pub streaming: bool,
    /// Current size of the output buffer
    pub output_bytes: usize,
}

/// Handler for GET /status
async fn get_status(State(streamer): State<Arc<Streamer>>) -> Json<StatusSnapshot> {
    Json(streamer.status().await)
}

/// Handler for GET /output, the raw captured encoder output
async fn get_output(State(streamer): State<Arc<Streamer>>) -> String {
    streamer.output().snapshot().await
}

/// Creates the axum Router with the status endpoints
pub fn create_status_router(streamer: Arc<Streamer>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/output", get(get_output))
        .with_state(streamer)
}

/// Runs the status HTTP server on the configured address
pub async fn run_status_server(streamer: Arc<Streamer>, addr: &str) -> Result<(), ServerError> {
    let addr: SocketAddr = addr.parse()?;
    let app = create_status_router(streamer);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.map_err(ServerError::Bind)?;

    Ok(())
}

/// Spawn the periodic task that truncates the output buffer to its ceiling.
pub fn start_output_trim(sink: Arc<OutputSink>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(OUTPUT_TRIM_INTERVAL);
        loop {
            interval.tick().await;
            let before = sink.truncate().await;
            let after = sink.len().await;
            if before > after {
                tracing::debug!(before, after, "trimmed output buffer");
            }
        }
    })
}
