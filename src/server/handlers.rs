//! Handlers for the core dashboard endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{DeckError, Result};
use crate::history::record::{MessageRecord, now_millis};
use crate::history::sessions::{self, MessagePage, SessionDetail, SessionSummary};
use crate::relay::ChatReply;

use super::AppState;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": now_millis() }))
}

/// Agent status as presented to the UI
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    timestamp: i64,
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.probe.check_status().await;
    Json(StatusResponse {
        status: if status.running { "running" } else { "stopped" },
        pid: status.pid,
        cpu: status.cpu_percent.map(|v| format!("{v}%")),
        memory: status.mem_percent.map(|v| format!("{v}%")),
        time: status.cpu_time,
        timestamp: now_millis(),
    })
}

/// Combined history payload: derived sessions plus the raw record stream
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    sessions: Vec<SessionSummary>,
    messages: Vec<MessageRecord>,
}

/// GET /api/history
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>> {
    let records = state.log.read_all().await?;
    let sessions = sessions::list_sessions(&records);
    Ok(Json(HistoryResponse {
        sessions,
        messages: records,
    }))
}

/// GET /api/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>> {
    let records = state.log.read_all().await?;
    Ok(Json(sessions::session_detail(&records, &session_id)?))
}

/// Body of a session rename request
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    title: Option<String>,
}

/// PATCH /api/sessions/{session_id}
///
/// Titles are client-local state: the request is acknowledged but nothing is
/// persisted server-side.
pub async fn rename_session(
    Path(session_id): Path<String>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<Value>> {
    let title = body
        .title
        .filter(|title| !title.is_empty())
        .ok_or_else(|| DeckError::validation("title is required"))?;

    Ok(Json(json!({
        "id": session_id,
        "title": title,
        "updatedAt": now_millis(),
    })))
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>> {
    let removed = state.log.delete_session(&session_id).await?;
    log::info!("deleted session {session_id} ({removed} records)");
    Ok(Json(json!({ "success": true, "message": "Session deleted" })))
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// GET /api/sessions/{session_id}/messages
pub async fn session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<MessagePage>> {
    let records = state.log.read_all().await?;
    Ok(Json(sessions::page_messages(
        &records,
        &session_id,
        params.limit.unwrap_or(100),
        params.offset.unwrap_or(0),
    )))
}

/// POST /api/chat
///
/// The body is taken as a raw value so a missing or non-string `message`
/// maps to 400 rather than an axum deserialization rejection.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ChatReply>> {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .ok_or_else(|| DeckError::validation("message is required"))?;

    let session_id = body
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string);

    let reply = state.relay.send(message, session_id).await?;
    Ok(Json(reply))
}
