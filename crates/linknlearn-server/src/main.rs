//! # linknlearn-server
//!
//! HTTP backend for the LinknLearn campus network.
//!
//! This binary provides:
//! - **Institutional-email accounts** (sign-up, verification, sessions)
//! - **The connection graph**: directed link requests that become symmetric
//!   connections on acceptance
//! - **Chat** over sorted-pair conversation addresses, with SSE live streams
//! - **Campus feed** posts and likes, plus issue reports
//! - **Image storage**, local blobs or an external image host

mod api;
mod blob_store;
mod config;
mod error;
mod image_host;
mod sessions;
mod watch;

use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use linknlearn_store::Database;

use crate::api::AppState;
use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::image_host::ImageHost;
use crate::sessions::Sessions;
use crate::watch::StreamHub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,linknlearn_server=debug")),
        )
        .init();

    info!("Starting LinknLearn server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = Config::from_env();
    info!(addr = %config.http_addr, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // SQLite store (runs migrations on open)
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    // Blob store (creates directory if missing)
    let blobs = Arc::new(
        BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size).await?,
    );

    let images = Arc::new(ImageHost::new(
        config.image_host_url.clone(),
        config.image_host_client_id.clone(),
    ));
    info!(
        external_uploads = images.is_configured(),
        "Image host client ready"
    );

    let http_addr = config.http_addr;
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        sessions: Sessions::new(),
        hub: StreamHub::new(),
        blobs,
        images,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
