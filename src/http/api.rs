//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Session ids arrive as path strings; ids that
//! do not parse are treated like unknown sessions.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::documents::{UploadedDocument, preview};
use crate::session::{Session, SessionError};

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct SettingsRequest {
    temperature: f32,
    max_tokens: u32,
    show_thinking: bool,
}

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
}

/// A document upload. `data` is standard base64, optionally still carrying
/// the `data:…;base64,` prefix a browser `FileReader` produces.
#[derive(Deserialize)]
pub(super) struct UploadRequest {
    name: String,
    #[serde(default)]
    media_type: String,
    data: String,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn session_error(e: SessionError) -> Response {
    let (status, code) = match &e {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        SessionError::EmptyMessage => (StatusCode::UNPROCESSABLE_ENTITY, "empty_message"),
        SessionError::Busy => (StatusCode::CONFLICT, "busy"),
        SessionError::Settings(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_settings"),
    };
    (status, json_error(code, e)).into_response()
}

fn bad_body(rejection: JsonRejection) -> Response {
    (rejection.status(), json_error("bad_request", rejection.body_text())).into_response()
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        (StatusCode::NOT_FOUND, json_error("not_found", format!("session not found: {raw}"))).into_response()
    })
}

fn decode_upload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD.decode(payload.trim())
}

fn session_view(state: &AppState, id: Uuid) -> Response {
    match state.sessions.with(id, |s| s.view()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => session_error(e),
    }
}

// ── Health ────────────────────────────────────────────────────────────────────

fn health_body(state: &AppState, llm_available: bool) -> Response {
    let provider = state.assistant.provider();
    let body = json!({
        "status": "ok",
        "bot_name": &*state.bot_name,
        "provider": provider.name(),
        "model": provider.model(),
        "llm_available": llm_available,
        "sessions": state.sessions.len(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/health: availability as cached since the first check.
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let available = state.assistant.is_available().await;
    health_body(&state, available)
}

/// POST /api/health/refresh: check the inference service again.
pub(super) async fn health_refresh(State(state): State<AppState>) -> Response {
    let available = state.assistant.refresh_availability().await;
    health_body(&state, available)
}

// ── Sessions ──────────────────────────────────────────────────────────────────

/// POST /api/sessions
pub(super) async fn create_session(State(state): State<AppState>) -> Response {
    let view = state.sessions.create();
    (StatusCode::CREATED, Json(view)).into_response()
}

/// GET /api/sessions/{id}
pub(super) async fn session_detail(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match parse_id(&session_id) {
        Ok(id) => session_view(&state, id),
        Err(resp) => resp,
    }
}

/// PUT /api/sessions/{id}/settings: returns the session view, since the
/// thinking toggle changes how earlier turns display.
pub(super) async fn update_settings(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<SettingsRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };

    match state
        .sessions
        .update_settings(id, req.temperature, req.max_tokens, req.show_thinking)
    {
        Ok(_) => session_view(&state, id),
        Err(e) => session_error(e),
    }
}

/// POST /api/sessions/{id}/messages
///
/// The submission runs on its own task so a client that disconnects mid-way
/// does not leave the session stuck awaiting a response.
pub(super) async fn submit_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };

    let sessions = state.sessions.clone();
    let assistant = state.assistant.clone();
    let task = tokio::spawn(async move { sessions.submit(id, &req.message, &assistant).await });

    match task.await {
        Ok(Ok(turn)) => (StatusCode::OK, Json(turn)).into_response(),
        Ok(Err(e)) => session_error(e),
        Err(e) => {
            warn!(session_id = %id, "submission task failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

/// DELETE /api/sessions/{id}/turns
pub(super) async fn clear_turns(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.sessions.clear(id) {
        Ok(()) => session_view(&state, id),
        Err(e) => session_error(e),
    }
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// PUT /api/sessions/{id}/document: attach (or replace) the session's
/// document and return its preview.
pub(super) async fn attach_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = state.sessions.get(id) {
        return session_error(e);
    }
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_body(rejection),
    };

    let bytes = match decode_upload(&req.data) {
        Ok(b) => b,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, json_error("invalid_upload", format!("data is not base64: {e}")))
                .into_response();
        }
    };

    let doc = UploadedDocument { name: req.name, media_type: req.media_type, bytes };
    // Parsing a large workbook can take a while; keep it off the executor.
    let preview = match tokio::task::spawn_blocking({
        let doc = doc.clone();
        move || preview::preview(&doc.bytes, &doc.media_type)
    })
    .await
    {
        Ok(p) => p,
        Err(e) => preview::Preview::Text(format!("Error generating preview: {e}")),
    };

    info!(session_id = %id, name = %doc.name, media_type = %doc.media_type, bytes = doc.bytes.len(), "document attached");
    match state.sessions.with(id, |s| {
        s.attach_document(doc);
        s.view().document
    }) {
        Ok(document) => (StatusCode::OK, Json(json!({ "document": document, "preview": preview }))).into_response(),
        Err(e) => session_error(e),
    }
}

/// DELETE /api/sessions/{id}/document
pub(super) async fn detach_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let id = match parse_id(&session_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.sessions.with(id, Session::detach_document) {
        Ok(removed) => {
            if let Some(doc) = removed {
                info!(session_id = %id, name = %doc.name, "document detached");
            }
            session_view(&state, id)
        }
        Err(e) => session_error(e),
    }
}
