/**
 * Chat Room Handlers
 *
 * - GET    /api/chat/rooms/{id}/messages        room history (`?before=<id>&limit=<n>`)
 * - POST   /api/chat/rooms/{id}/messages        send a message
 * - GET    /api/chat/rooms/{id}/messages/count  number of stored messages
 * - DELETE /api/chat/messages/{messageId}       delete a message (sender or Admin)
 *
 * All of them require membership of the project (or Admin).
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::chat::db::{count_messages, delete_message, get_message, load_history, ChatMessage};
use crate::backend::chat::service::ChatService;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::projects::access::{ensure_member, load_member_project};
use crate::backend::server::retry::retry_read;
use crate::shared::ProjectId;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCountResponse {
    pub project_id: ProjectId,
    pub count: i64,
}

/// Room history, oldest first
pub async fn get_messages(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, BackendError> {
    load_member_project(&pool, &principal, project_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);

    let messages = retry_read("load chat history", || {
        load_history(&pool, project_id, query.before, limit)
    })
    .await?;
    Ok(Json(messages))
}

/// Send a message to a room
///
/// # Errors
///
/// * `400 Bad Request` - Empty or too long
/// * `403 Forbidden` - Not a member
/// * `404 Not Found` - Unknown project
pub async fn post_message(
    State(pool): State<SqlitePool>,
    State(chat): State<ChatService>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), BackendError> {
    load_member_project(&pool, &principal, project_id).await?;
    let message = chat.send_message(project_id, &principal, &request.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Number of messages stored for a room
pub async fn get_message_count(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<MessageCountResponse>, BackendError> {
    load_member_project(&pool, &principal, project_id).await?;
    let count = retry_read("count messages", || count_messages(&pool, project_id)).await?;
    Ok(Json(MessageCountResponse { project_id, count }))
}

/// Delete a message
///
/// # Errors
///
/// * `404 Not Found` - Unknown message
/// * `403 Forbidden` - Caller is neither the sender nor an admin
pub async fn delete_message_handler(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path(message_id): Path<i64>,
) -> Result<StatusCode, BackendError> {
    let message = retry_read("load message", || get_message(&pool, message_id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Message {} not found", message_id)))?;

    ensure_member(&pool, &principal, message.project_id).await?;
    if message.sender_id != principal.id && !principal.is_admin() {
        return Err(BackendError::forbidden("Only the sender can delete a message"));
    }

    delete_message(&pool, message_id).await?;
    tracing::info!(
        "[Chat] User {} deleted message {} in room {}",
        principal.id,
        message_id,
        message.project_id
    );
    Ok(StatusCode::NO_CONTENT)
}
