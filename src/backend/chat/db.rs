/**
 * Database Operations for Chat Messages
 *
 * This module persists project chat messages and reads room history.
 * Messages are either `CHAT` posts or `JOIN` announcements.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::shared::{ProjectId, UserId};

/// Kind of room message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Chat,
    Join,
}

/// Stored chat message, with the sender's username joined in
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub project_id: ProjectId,
    pub sender_id: UserId,
    pub sender_username: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.project_id, m.sender_id, u.username AS sender_username,
           m.message_type, m.content, m.created_at
    FROM chat_messages m
    JOIN users u ON u.id = m.sender_id
"#;

/// Save a message to the database
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `project_id` - Room the message was sent to
/// * `sender_id` - Author
/// * `message_type` - Post or join announcement
/// * `content` - Validated message text
///
/// # Returns
/// The stored message
pub async fn save_message(
    pool: &SqlitePool,
    project_id: ProjectId,
    sender_id: UserId,
    message_type: MessageType,
    content: &str,
) -> Result<ChatMessage, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO chat_messages (project_id, sender_id, message_type, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(project_id)
    .bind(sender_id)
    .bind(message_type)
    .bind(content)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    get_message(pool, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Get message by ID
pub async fn get_message(pool: &SqlitePool, id: i64) -> Result<Option<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Load a room's history
///
/// # Arguments
/// * `before` - Only messages with a smaller id (paging backwards)
/// * `limit` - Maximum number of messages
///
/// # Returns
/// Messages in chronological order
pub async fn load_history(
    pool: &SqlitePool,
    project_id: ProjectId,
    before: Option<i64>,
    limit: i64,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    let mut messages = sqlx::query_as::<_, ChatMessage>(&format!(
        "{MESSAGE_SELECT} WHERE m.project_id = ? AND m.id < ? ORDER BY m.id DESC LIMIT ?"
    ))
    .bind(project_id)
    .bind(before.unwrap_or(i64::MAX))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}

/// Delete a message
///
/// # Returns
/// `true` when a message was removed
pub async fn delete_message(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chat_messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Number of messages in a room
pub async fn count_messages(pool: &SqlitePool, project_id: ProjectId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE project_id = ?")
        .bind(project_id)
        .fetch_one(pool)
        .await
}
