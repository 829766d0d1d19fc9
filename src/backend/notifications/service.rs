/**
 * Notification Service
 *
 * Persists a notification and then hands it to the broadcast router for
 * live delivery on `user.<id>.notifications`. The record is stored first,
 * so a user without a live session still finds it through
 * GET /api/notifications.
 */

use std::fmt;

use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::backend::notifications::db::{insert_notification, NewNotification, Notification};
use crate::backend::realtime::registry::DeliveryOutcome;
use crate::backend::realtime::router::BroadcastRouter;
use crate::shared::{BroadcastEvent, UserId};

/// Kinds of notification the backend emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TaskAssigned,
    ProjectMemberAdded,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "TASK_ASSIGNED",
            NotificationKind::ProjectMemberAdded => "PROJECT_MEMBER_ADDED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity a notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: &'static str,
    pub id: i64,
}

impl EntityRef {
    pub fn task(id: i64) -> Self {
        Self { entity_type: "TASK", id }
    }

    pub fn project(id: i64) -> Self {
        Self { entity_type: "PROJECT", id }
    }
}

/// A stored notification and what live delivery did with it
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub notification: Notification,
    pub delivery: DeliveryOutcome,
}

/// Creates and delivers notifications
#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    router: BroadcastRouter,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, router: BroadcastRouter) -> Self {
        Self { pool, router }
    }

    /// Persist a notification for `target` and route it to their queue
    ///
    /// # Returns
    /// * `Ok(None)` - `source` and `target` are the same user, nothing stored
    /// * `Ok(Some(dispatched))` - Stored; `delivery` is `Miss` when the target
    ///   has no live session
    pub async fn create_and_send(
        &self,
        source: Option<UserId>,
        target: UserId,
        kind: NotificationKind,
        message: &str,
        entity: Option<EntityRef>,
    ) -> Result<Option<Dispatched>, BackendError> {
        if source == Some(target) {
            tracing::debug!("[Notifications] Skipping self-notification for user {}", target);
            return Ok(None);
        }

        let notification = insert_notification(
            &self.pool,
            &NewNotification {
                user_id: target,
                source_user_id: source,
                kind: kind.as_str(),
                message,
                entity_type: entity.map(|e| e.entity_type),
                entity_id: entity.map(|e| e.id),
            },
        )
        .await?;

        let payload = serde_json::to_value(&notification)?;
        let delivery = self.router.publish(BroadcastEvent::notification(target, payload));

        tracing::info!(
            "[Notifications] {} notification {} for user {} ({:?})",
            kind,
            notification.id,
            target,
            delivery
        );

        Ok(Some(Dispatched {
            notification,
            delivery,
        }))
    }

    /// Notify after a write that is already committed
    ///
    /// A failure is logged and swallowed; the caller's write stands.
    pub async fn notify_committed(
        &self,
        source: Option<UserId>,
        target: UserId,
        kind: NotificationKind,
        message: &str,
        entity: Option<EntityRef>,
    ) -> Option<Dispatched> {
        match self.create_and_send(source, target, kind, message, entity).await {
            Ok(dispatched) => dispatched,
            Err(err) => {
                tracing::warn!(
                    "[Notifications] Failed to create {} notification for user {}: {}",
                    kind,
                    target,
                    err
                );
                None
            }
        }
    }
}
