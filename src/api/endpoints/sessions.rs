//! Conversation endpoints.
//!
//! - `POST /api/sessions` — start a conversation (greeting turn)
//! - `GET /api/sessions/:id` — transcript and dashboard
//! - `POST /api/sessions/:id/messages` — run a turn with a patient message
//! - `POST /api/sessions/:id/slots` — pick one of the offered slots
//! - `DELETE /api/sessions/:id` — forget the conversation

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionResponse, MAX_MESSAGE_CHARS};
use crate::scheduling::SLOT_SELECTION_PREFIX;

#[derive(Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// `slot` is either a label (`Dr. Smith at 2024-05-06 09:00 AM`) or the full
/// selection message.
#[derive(Deserialize)]
pub struct SlotRequest {
    pub slot: String,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub removed: bool,
}

/// `POST /api/sessions`
pub async fn create(
    State(ctx): State<ApiContext>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let core = ctx.core.clone();
    let (session_id, state, outcome) =
        tokio::task::spawn_blocking(move || core.start_session()).await??;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::from_turn(session_id, state, outcome)),
    ))
}

/// `GET /api/sessions/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let core = ctx.core.clone();
    let id = session_id.clone();
    let state = tokio::task::spawn_blocking(move || core.load_session(&id)).await??;
    Ok(Json(SessionResponse::from_state(session_id, state)))
}

/// `POST /api/sessions/:id/messages`
pub async fn message(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".into()));
    }
    if req.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} chars)"
        )));
    }
    run_turn(ctx, session_id, req.message).await
}

/// `POST /api/sessions/:id/slots`
pub async fn select_slot(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let slot = req.slot.trim();
    if slot.is_empty() {
        return Err(ApiError::BadRequest("Slot cannot be empty".into()));
    }
    let message = if slot.starts_with(SLOT_SELECTION_PREFIX) {
        slot.to_string()
    } else {
        format!("{SLOT_SELECTION_PREFIX} {slot}")
    };
    run_turn(ctx, session_id, message).await
}

/// `DELETE /api/sessions/:id`
pub async fn reset(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let core = ctx.core.clone();
    let id = session_id.clone();
    let removed = tokio::task::spawn_blocking(move || core.reset_session(&id)).await??;
    if !removed {
        return Err(ApiError::NotFound(format!("Session {session_id} not found")));
    }
    tracing::info!(session_id = %session_id, "Conversation reset");
    Ok(Json(ResetResponse {
        session_id,
        removed,
    }))
}

async fn run_turn(
    ctx: ApiContext,
    session_id: String,
    message: String,
) -> Result<Json<SessionResponse>, ApiError> {
    let core = ctx.core.clone();
    let id = session_id.clone();
    let (state, outcome) =
        tokio::task::spawn_blocking(move || core.send_message(&id, &message)).await??;
    Ok(Json(SessionResponse::from_turn(session_id, state, outcome)))
}
