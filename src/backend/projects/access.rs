/**
 * Project Access
 *
 * Membership and ownership checks shared by the HTTP handlers and the
 * realtime authorizer. Admins pass every check.
 */

use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::error::BackendError;
use crate::backend::projects::db::{get_project, is_member, Project};
use crate::backend::server::retry::retry_read;
use crate::shared::{ProjectId, UserId};

/// Require the principal to be a member of the project (or an admin)
///
/// # Errors
/// * `AuthorizationDenied` - Not a member
/// * `Store` - Lookup failed after retries
pub async fn ensure_member(
    pool: &SqlitePool,
    principal: &Principal,
    project_id: ProjectId,
) -> Result<(), BackendError> {
    if principal.is_admin() {
        return Ok(());
    }

    let member = retry_read("membership check", || is_member(pool, project_id, principal.id)).await?;
    if member {
        Ok(())
    } else {
        tracing::warn!(
            "[Projects] User {} is not a member of project {}",
            principal.id,
            project_id
        );
        Err(BackendError::forbidden(format!(
            "Not a member of project {}",
            project_id
        )))
    }
}

/// Load a project, `404` when it does not exist
pub async fn load_project(pool: &SqlitePool, project_id: ProjectId) -> Result<Project, BackendError> {
    retry_read("load project", || get_project(pool, project_id))
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Project {} not found", project_id)))
}

/// Load a project the principal can see
pub async fn load_member_project(
    pool: &SqlitePool,
    principal: &Principal,
    project_id: ProjectId,
) -> Result<Project, BackendError> {
    let project = load_project(pool, project_id).await?;
    ensure_member(pool, principal, project_id).await?;
    Ok(project)
}

/// Load a project the principal may administer: its owner, or an admin
///
/// # Errors
/// * `NotFound` - Unknown project
/// * `AuthorizationDenied` - Caller is neither owner nor admin
pub async fn load_owned_project(
    pool: &SqlitePool,
    principal: &Principal,
    project_id: ProjectId,
    action: &str,
) -> Result<Project, BackendError> {
    let project = load_project(pool, project_id).await?;
    if project.owner_id != principal.id && !principal.is_admin() {
        tracing::warn!(
            "[Projects] User {} tried to {} in project {}",
            principal.id,
            action,
            project_id
        );
        return Err(BackendError::forbidden(format!(
            "Only the project owner can {}",
            action
        )));
    }
    Ok(project)
}

/// Require a prospective assignee to be a member of the project
pub async fn ensure_assignable(
    pool: &SqlitePool,
    project_id: ProjectId,
    assignee: UserId,
) -> Result<(), BackendError> {
    let member = retry_read("membership check", || is_member(pool, project_id, assignee)).await?;
    if member {
        Ok(())
    } else {
        Err(BackendError::validation(
            "assigneeId",
            "Assignee must be a member of the project",
        ))
    }
}
