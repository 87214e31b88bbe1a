//! Axum front end: the chat page at `/` and the JSON API under `/api/`.
//!
//! ## URL layout
//!
//! ```text
//! GET    /api/health
//! POST   /api/health/refresh
//! POST   /api/sessions
//! GET    /api/sessions/{id}
//! PUT    /api/sessions/{id}/settings
//! POST   /api/sessions/{id}/messages
//! DELETE /api/sessions/{id}/turns
//! PUT    /api/sessions/{id}/document
//! DELETE /api/sessions/{id}/document
//! GET    /favicon.ico              → 204
//! GET    /                         → chat page
//! ```

mod api;
mod ui;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chat::Assistant;
use crate::error::AppError;
use crate::session::SessionStore;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub bot_name: Arc<str>,
    pub sessions: Arc<SessionStore>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(bot_name: &str, sessions: SessionStore, assistant: Assistant) -> Self {
        Self {
            bot_name: Arc::from(bot_name),
            sessions: Arc::new(sessions),
            assistant: Arc::new(assistant),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Room for the upload's JSON fields around the encoded file.
const UPLOAD_ENVELOPE_BYTES: usize = 64 * 1024;

/// Request body cap that admits a file of `max_upload_bytes` once it is
/// base64-encoded into a JSON upload.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(UPLOAD_ENVELOPE_BYTES)
}

/// Build the full router. `max_upload_bytes` is the largest document, in raw
/// bytes, an upload may carry; every request body is capped accordingly.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // API routes
        .route("/api/health",                      get(api::health))
        .route("/api/health/refresh",              post(api::health_refresh))
        .route("/api/sessions",                    post(api::create_session))
        .route("/api/sessions/{session_id}",       get(api::session_detail))
        .route("/api/sessions/{session_id}/settings", put(api::update_settings))
        .route("/api/sessions/{session_id}/messages", post(api::submit_message))
        .route("/api/sessions/{session_id}/turns", delete(api::clear_turns))
        .route(
            "/api/sessions/{session_id}/document",
            put(api::attach_document).delete(api::detach_document),
        )
        // UI routes
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/",            get(ui::root))
        .layer(DefaultBodyLimit::max(body_limit(max_upload_bytes)))
        .with_state(state)
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind `bind_addr` and serve `router` until `shutdown` is cancelled.
pub async fn serve(bind_addr: &str, router: Router, shutdown: CancellationToken) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    let local = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("local address unavailable: {e}")))?;
    info!(%local, "chat server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("chat server shut down");
    Ok(())
}
