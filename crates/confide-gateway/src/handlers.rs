// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Extension, Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use confide_core::{ConfideError, ConversationId, HealthStatus, OwnerId, PluginAdapter};
use confide_engine::{ConversationDetail, ConversationSummary, ConversationUpdate};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::sse;

/// Header carrying the conversation a chat response belongs to.
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

/// Request body for POST /api/conversations/chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Continue this conversation; start a new one when absent.
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub message: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// POST /api/conversations/chat
///
/// Streams the reply as raw UTF-8 text chunks, or as Server-Sent Events
/// when the client sends `Accept: text/event-stream`. Authorization and
/// validation failures are returned as JSON errors before streaming starts.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Extension(owner): Extension<OwnerId>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let turn = state
        .engine
        .handle_turn(&owner, body.conversation_id, &body.message)
        .await?;

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let conversation_id = HeaderValue::from_str(turn.conversation_id.as_str())
        .map_err(|e| ConfideError::Internal(e.to_string()))?;

    let mut response = if accept.contains("text/event-stream") {
        sse::chat_events(turn).into_response()
    } else {
        let mut response = Response::new(Body::from_stream(turn.fragments));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    };
    response
        .headers_mut()
        .insert(CONVERSATION_ID_HEADER, conversation_id);
    Ok(response)
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.engine.conversations().list(&owner).await?))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let id = ConversationId::new(id);
    Ok(Json(state.engine.conversations().detail(&owner, &id).await?))
}

/// PUT /api/conversations/{id}
pub async fn update_conversation(
    State(state): State<GatewayState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
    Json(update): Json<ConversationUpdate>,
) -> Result<Json<ConversationSummary>, ApiError> {
    let id = ConversationId::new(id);
    Ok(Json(
        state
            .engine
            .conversations()
            .update(&owner, &id, update)
            .await?,
    ))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = ConversationId::new(id);
    state.engine.conversations().delete(&owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
///
/// Unauthenticated. Reports the store's health alongside uptime.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.engine.store().health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("unhealthy: {reason}"),
        ),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}")),
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.started.elapsed().as_secs(),
        }),
    )
}
