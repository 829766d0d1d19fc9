//! Database operations for notifications

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::shared::UserId;

/// Notification record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub source_user_id: Option<UserId>,
    pub kind: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields of a notification about to be stored
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub user_id: UserId,
    pub source_user_id: Option<UserId>,
    pub kind: &'a str,
    pub message: &'a str,
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<i64>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, source_user_id, kind, message, entity_type, entity_id, is_read, created_at";

/// Store a notification
pub async fn insert_notification(
    pool: &SqlitePool,
    new: &NewNotification<'_>,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (user_id, source_user_id, kind, message, entity_type, entity_id, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.source_user_id)
    .bind(new.kind)
    .bind(new.message)
    .bind(new.entity_type)
    .bind(new.entity_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Get notification by ID
pub async fn get_notification(pool: &SqlitePool, id: i64) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Most recent notifications of a user, newest first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: UserId,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? ORDER BY id DESC LIMIT ?"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Mark a notification read
///
/// # Returns
/// The updated record, `None` when no notification with this id belongs to
/// `user_id`
pub async fn mark_read(
    pool: &SqlitePool,
    id: i64,
    user_id: UserId,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ? RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Number of unread notifications of a user
pub async fn count_unread(pool: &SqlitePool, user_id: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .fetch_one(pool)
        .await
}
