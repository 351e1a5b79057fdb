//! HTTP API surface.
//!
//! One handler module per screen-facing domain: `auth`, `profiles`,
//! `links` (the connection graph), `chat`, and `feed`. DTOs cross the
//! boundary in camelCase; everything else stays in domain types.

pub mod auth;
pub mod chat;
pub mod feed;
pub mod links;
pub mod profiles;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::Method,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use linknlearn_store::Database;

use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::error::ApiError;
use crate::image_host::ImageHost;
use crate::sessions::Sessions;
use crate::watch::StreamHub;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub sessions: Sessions,
    pub hub: StreamHub,
    pub blobs: Arc<BlobStore>,
    pub images: Arc<ImageHost>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Borrow the store handle. Poisoning is not propagated: the store
    /// keeps no invariants across a panicked lock holder.
    pub fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Auth / session
        .route("/auth/signup", post(auth::signup))
        .route("/auth/verify", post(auth::verify_email))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/signout", post(auth::signout))
        // Profiles
        .route("/profiles/me", get(profiles::get_own).patch(profiles::update_own))
        .route("/profiles/:id", get(profiles::get_by_id))
        .route("/users/search", get(profiles::search))
        // Connection graph
        .route("/links", post(links::send))
        .route("/links/pending", get(links::pending))
        .route("/links/pending/events", get(links::pending_events))
        .route("/links/sent", get(links::sent))
        .route("/links/connections", get(links::connections))
        .route("/links/:id/accept", post(links::accept))
        .route("/links/:id/reject", post(links::reject))
        .route("/links/:id", delete(links::cancel))
        // Conversations
        .route("/chats", get(chat::inbox))
        .route("/chats/:peer/messages", get(chat::history).post(chat::send))
        .route("/chats/:peer/events", get(chat::events))
        // Feed and reports
        .route("/feed", get(feed::list_posts).post(feed::create_post))
        .route("/feed/:id/like", post(feed::like_post))
        .route("/reports", get(feed::list_reports).post(feed::create_report))
        // Images
        .route("/images", post(image_upload))
        .route("/images/external", post(external_image_upload))
        .route("/blob/:id", get(blob_download))
        .layer(DefaultBodyLimit::max(state.config.max_blob_size + 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Health and images
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageUploadResponse {
    id: Uuid,
    url: String,
}

/// Store an uploaded image locally and hand back its public URL.
async fn image_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {e}")))?;

            let id = state.blobs.store(&data).await?;

            info!(id = %id, size = data.len(), "Image uploaded");

            return Ok(Json(ImageUploadResponse {
                id,
                url: format!("/blob/{id}"),
            }));
        }
    }

    Err(ApiError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

async fn blob_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Vec<u8>, ApiError> {
    let data = state.blobs.get(id).await?;
    Ok(data)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalImageRequest {
    image_base64: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExternalImageResponse {
    link: String,
}

/// Forward a base64 image to the external image host.
async fn external_image_upload(
    State(state): State<AppState>,
    Json(req): Json<ExternalImageRequest>,
) -> Result<Json<ExternalImageResponse>, ApiError> {
    if req.image_base64.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty image".to_string()));
    }
    let link = state.images.upload_base64(&req.image_base64).await?;
    Ok(Json(ExternalImageResponse { link }))
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------
