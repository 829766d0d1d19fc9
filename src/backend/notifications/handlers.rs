/**
 * Notification Handlers
 *
 * - GET /api/notifications           newest notifications of the caller
 * - PUT /api/notifications/{id}/read mark one read (target user only)
 */

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::db::{
    count_unread, get_notification, list_for_user, mark_read, Notification,
};
use crate::backend::server::retry::retry_read;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

/// List the caller's notifications
pub async fn list_notifications(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationList>, BackendError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let notifications =
        retry_read("list notifications", || list_for_user(&pool, principal.id, limit)).await?;
    let unread = retry_read("count unread", || count_unread(&pool, principal.id)).await?;

    Ok(Json(NotificationList {
        notifications,
        unread,
    }))
}

/// Mark a notification read
///
/// # Errors
///
/// * `404 Not Found` - No such notification
/// * `403 Forbidden` - Notification belongs to another user
pub async fn mark_notification_read(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, BackendError> {
    let existing = retry_read("load notification", || get_notification(&pool, id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Notification {} not found", id)))?;

    if existing.user_id != principal.id {
        return Err(BackendError::forbidden(
            "Cannot modify another user's notification",
        ));
    }

    let updated = mark_read(&pool, id, principal.id)
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Notification {} not found", id)))?;
    Ok(Json(updated))
}
