/**
 * Task Handlers
 *
 * - PUT    /api/tasks/{taskId}
 * - DELETE /api/tasks/{taskId}
 * - POST   /api/tasks/{taskId}/dependencies/{dependencyId}
 * - DELETE /api/tasks/{taskId}/dependencies/{dependencyId}
 * - GET    /api/tasks/{taskId}/dependencies
 *
 * Editing or deleting a task is reserved to the project owner and admins.
 * For the dependency routes `taskId` is the dependent task, `dependencyId`
 * its prerequisite, and the caller must be a member of the task's project.
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::{EntityRef, NotificationKind, NotificationService};
use crate::backend::projects::access::{ensure_assignable, ensure_member, load_owned_project};
use crate::backend::projects::handlers::{required_text, MAX_TITLE_LEN};
use crate::backend::server::retry::retry_read;
use crate::backend::tasks::db::{get_task, update_task, Task, TaskStatus};
use crate::backend::tasks::guard::{DependencyGuard, EdgeChange};
use crate::shared::{TaskId, UserId};

/// Replacement values for a task
///
/// `status` keeps its current value when omitted; a missing `assigneeId`
/// clears the assignee.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

/// Response of a dependency write
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResponse {
    pub dependent: TaskId,
    pub prerequisite: TaskId,
    pub created: bool,
}

async fn task_for_member(
    pool: &SqlitePool,
    principal: &Principal,
    task_id: TaskId,
) -> Result<Task, BackendError> {
    let task = retry_read("load task", || get_task(pool, task_id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Task {} not found", task_id)))?;
    ensure_member(pool, principal, task.project_id).await?;
    Ok(task)
}

async fn task_for_owner(
    pool: &SqlitePool,
    principal: &Principal,
    task_id: TaskId,
    action: &str,
) -> Result<(Task, String), BackendError> {
    let task = retry_read("load task", || get_task(pool, task_id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Task {} not found", task_id)))?;
    let project = load_owned_project(pool, principal, task.project_id, action).await?;
    Ok((task, project.name))
}

/// Update a task
///
/// Assigning the task to a new user notifies that user.
///
/// # Errors
///
/// * `404 Not Found` - Unknown task
/// * `403 Forbidden` - Caller is neither the project owner nor an admin
/// * `400 Bad Request` - Empty title, or assignee outside the project
pub async fn update_task_handler(
    State(pool): State<SqlitePool>,
    State(notifications): State<NotificationService>,
    AuthUser(principal): AuthUser,
    Path(task_id): Path<TaskId>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, BackendError> {
    let (current, project_name) = task_for_owner(&pool, &principal, task_id, "edit tasks").await?;
    let title = required_text("title", &request.title, MAX_TITLE_LEN)?;
    if let Some(assignee) = request.assignee_id {
        ensure_assignable(&pool, current.project_id, assignee).await?;
    }

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let task = update_task(
        &pool,
        task_id,
        &title,
        description,
        request.status.unwrap_or(current.status),
        request.assignee_id,
    )
    .await?
    .ok_or_else(|| BackendError::not_found(format!("Task {} not found", task_id)))?;

    tracing::info!("[Tasks] User {} updated task {}", principal.id, task_id);

    if let Some(assignee) = task.assignee_id.filter(|a| current.assignee_id != Some(*a)) {
        notifications
            .notify_committed(
                Some(principal.id),
                assignee,
                NotificationKind::TaskAssigned,
                &format!("You were assigned \"{}\" in {}", task.title, project_name),
                Some(EntityRef::task(task.id)),
            )
            .await;
    }

    Ok(Json(task))
}

/// Delete a task and its dependency edges
///
/// # Errors
///
/// * `404 Not Found` - Unknown task
/// * `403 Forbidden` - Caller is neither the project owner nor an admin
pub async fn delete_task_handler(
    State(pool): State<SqlitePool>,
    State(guard): State<Arc<DependencyGuard>>,
    AuthUser(principal): AuthUser,
    Path(task_id): Path<TaskId>,
) -> Result<StatusCode, BackendError> {
    let (task, _) = task_for_owner(&pool, &principal, task_id, "delete tasks").await?;
    if !guard.delete_task(&task).await? {
        return Err(BackendError::not_found(format!("Task {} not found", task_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Add a dependency
///
/// # Errors
///
/// * `409 Conflict` - Self-loop or the edge would close a cycle
/// * `404 Not Found` - Unknown task
/// * `400 Bad Request` - Tasks of different projects
pub async fn add_dependency(
    State(pool): State<SqlitePool>,
    State(guard): State<Arc<DependencyGuard>>,
    AuthUser(principal): AuthUser,
    Path((task_id, dependency_id)): Path<(TaskId, TaskId)>,
) -> Result<(StatusCode, Json<DependencyResponse>), BackendError> {
    task_for_member(&pool, &principal, task_id).await?;

    let change = guard.add_dependency(task_id, dependency_id).await?;
    let status = match change {
        EdgeChange::Created => StatusCode::CREATED,
        EdgeChange::AlreadyPresent => StatusCode::OK,
    };

    Ok((
        status,
        Json(DependencyResponse {
            dependent: task_id,
            prerequisite: dependency_id,
            created: change == EdgeChange::Created,
        }),
    ))
}

/// Remove a dependency
pub async fn remove_dependency(
    State(pool): State<SqlitePool>,
    State(guard): State<Arc<DependencyGuard>>,
    AuthUser(principal): AuthUser,
    Path((task_id, dependency_id)): Path<(TaskId, TaskId)>,
) -> Result<StatusCode, BackendError> {
    task_for_member(&pool, &principal, task_id).await?;
    guard.remove_dependency(task_id, dependency_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a task's prerequisites
pub async fn list_dependencies(
    State(pool): State<SqlitePool>,
    State(guard): State<Arc<DependencyGuard>>,
    AuthUser(principal): AuthUser,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Vec<Task>>, BackendError> {
    task_for_member(&pool, &principal, task_id).await?;
    Ok(Json(guard.prerequisites(task_id).await?))
}
