/**
 * Dashboard Statistics
 *
 * Aggregate counts for the admin dashboard, served over HTTP and pushed
 * periodically to `stats.dashboard`.
 */

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::backend::auth::users::{count_users, count_users_by_role};
use crate::backend::error::BackendError;
use crate::backend::projects::db::count_projects;
use crate::backend::realtime::registry::{DeliveryOutcome, SubscriberRegistry};
use crate::backend::realtime::router::BroadcastRouter;
use crate::backend::server::retry::retry_read;
use crate::backend::tasks::db::{count_dependencies, count_tasks, count_tasks_by_status};
use crate::shared::{BroadcastEvent, Destination};

/// Snapshot of platform-wide counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub total_projects: i64,
    pub total_tasks: i64,
    pub tasks_by_status: BTreeMap<String, i64>,
    pub total_dependencies: i64,
    pub live_connections: usize,
    pub generated_at: String,
}

/// Collect the current statistics
pub async fn collect_stats(
    pool: &SqlitePool,
    registry: &SubscriberRegistry,
) -> Result<DashboardStats, sqlx::Error> {
    let total_users = retry_read("count users", || count_users(pool)).await?;
    let users_by_role = retry_read("count roles", || count_users_by_role(pool)).await?;
    let total_projects = retry_read("count projects", || count_projects(pool)).await?;
    let total_tasks = retry_read("count tasks", || count_tasks(pool)).await?;
    let tasks_by_status = retry_read("count task status", || count_tasks_by_status(pool)).await?;
    let total_dependencies = retry_read("count dependencies", || count_dependencies(pool)).await?;

    Ok(DashboardStats {
        total_users,
        users_by_role: users_by_role.into_iter().collect(),
        total_projects,
        total_tasks,
        tasks_by_status: tasks_by_status.into_iter().collect(),
        total_dependencies,
        live_connections: registry.connection_count(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Collect and publish one snapshot to `stats.dashboard`
///
/// Nothing is collected while nobody is subscribed.
pub async fn broadcast_stats(
    pool: &SqlitePool,
    router: &BroadcastRouter,
) -> Result<DeliveryOutcome, BackendError> {
    if router.registry().subscriber_count(&Destination::DashboardStats) == 0 {
        return Ok(DeliveryOutcome::Miss);
    }

    let stats = collect_stats(pool, router.registry()).await?;
    let payload = serde_json::to_value(&stats)?;
    Ok(router.publish(BroadcastEvent::stats(payload)))
}

/// Publish statistics every `interval`
pub fn spawn_stats_broadcaster(
    pool: SqlitePool,
    router: BroadcastRouter,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = broadcast_stats(&pool, &router).await {
                tracing::warn!("[Dashboard] Failed to broadcast stats: {}", e);
            }
        }
    })
}
