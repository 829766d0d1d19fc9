/**
 * Project Handlers
 *
 * - GET  /api/projects                list the caller's projects
 * - POST /api/projects                create a project (caller becomes owner)
 * - POST /api/projects/{id}/members   add a member (owner or admin)
 * - DELETE /api/projects/{id}/members/{userId}  remove a member (owner or admin)
 * - POST /api/projects/{id}/tasks     create a task (members)
 * - GET  /api/projects/{id}/tasks     list tasks (members)
 *
 * Adding a member notifies that member; assigning a task to someone other
 * than its creator notifies the assignee. Notifications go out after the
 * write commits, and a failed notification does not fail the request.
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::auth::users::get_user_by_id;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::notifications::{EntityRef, NotificationKind, NotificationService};
use crate::backend::projects::access::{ensure_assignable, load_member_project, load_owned_project};
use crate::backend::projects::db::{
    add_member, create_project, list_projects_for_user, remove_member, Project,
};
use crate::backend::server::retry::retry_read;
use crate::backend::tasks::db::{create_task, list_project_tasks, Task};
use crate::shared::{ProjectId, UserId};

const MAX_NAME_LEN: usize = 100;
pub(crate) const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub added: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String, BackendError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BackendError::validation(field, format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(BackendError::validation(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(value.to_string())
}

/// List the caller's projects
pub async fn list_projects(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<Project>>, BackendError> {
    let projects =
        retry_read("list projects", || list_projects_for_user(&pool, principal.id)).await?;
    Ok(Json(projects))
}

/// Create a project
pub async fn create_project_handler(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), BackendError> {
    let name = required_text("name", &request.name, MAX_NAME_LEN)?;
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let project = create_project(&pool, &name, description, principal.id).await?;
    tracing::info!("[Projects] User {} created project {}", principal.id, project.id);
    Ok((StatusCode::CREATED, Json(project)))
}

/// Add a member to a project
///
/// # Errors
///
/// * `404 Not Found` - Unknown project or user
/// * `403 Forbidden` - Caller is neither the owner nor an admin
pub async fn add_member_handler(
    State(pool): State<SqlitePool>,
    State(notifications): State<NotificationService>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
    Json(request): Json<AddMemberRequest>,
) -> Result<Json<MemberResponse>, BackendError> {
    let project = load_owned_project(&pool, &principal, project_id, "add members").await?;

    retry_read("load user", || get_user_by_id(&pool, request.user_id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("User {} not found", request.user_id)))?;

    let added = add_member(&pool, project_id, request.user_id).await?;
    if added {
        notifications
            .notify_committed(
                Some(principal.id),
                request.user_id,
                NotificationKind::ProjectMemberAdded,
                &format!("You were added to project {}", project.name),
                Some(EntityRef::project(project_id)),
            )
            .await;
    }

    Ok(Json(MemberResponse {
        project_id,
        user_id: request.user_id,
        added,
    }))
}

/// Remove a member from a project
///
/// Tasks of the project assigned to the member become unassigned. The
/// owner cannot be removed.
///
/// # Errors
///
/// * `404 Not Found` - Unknown project, or the user is not a member
/// * `403 Forbidden` - Caller is neither the owner nor an admin
/// * `400 Bad Request` - Target is the project owner
pub async fn remove_member_handler(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path((project_id, user_id)): Path<(ProjectId, UserId)>,
) -> Result<StatusCode, BackendError> {
    let project = load_owned_project(&pool, &principal, project_id, "remove members").await?;
    if project.owner_id == user_id {
        return Err(BackendError::validation(
            "userId",
            "The project owner cannot be removed",
        ));
    }

    if !remove_member(&pool, project_id, user_id).await? {
        return Err(BackendError::not_found(format!(
            "User {} is not a member of project {}",
            user_id, project_id
        )));
    }

    tracing::info!(
        "[Projects] User {} removed user {} from project {}",
        principal.id,
        user_id,
        project_id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Create a task
///
/// # Errors
///
/// * `404 Not Found` - Unknown project
/// * `403 Forbidden` - Caller is not a member
/// * `400 Bad Request` - Empty title, or assignee outside the project
pub async fn create_task_handler(
    State(pool): State<SqlitePool>,
    State(notifications): State<NotificationService>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), BackendError> {
    let project = load_member_project(&pool, &principal, project_id).await?;
    let title = required_text("title", &request.title, MAX_TITLE_LEN)?;

    if let Some(assignee) = request.assignee_id {
        ensure_assignable(&pool, project_id, assignee).await?;
    }

    let task = create_task(
        &pool,
        project_id,
        &title,
        request.description.as_deref(),
        request.assignee_id,
        principal.id,
    )
    .await?;

    if let Some(assignee) = task.assignee_id {
        notifications
            .notify_committed(
                Some(principal.id),
                assignee,
                NotificationKind::TaskAssigned,
                &format!("You were assigned \"{}\" in {}", task.title, project.name),
                Some(EntityRef::task(task.id)),
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(task)))
}

/// List a project's tasks
pub async fn list_tasks_handler(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Vec<Task>>, BackendError> {
    load_member_project(&pool, &principal, project_id).await?;
    let tasks = retry_read("list tasks", || list_project_tasks(&pool, project_id)).await?;
    Ok(Json(tasks))
}
