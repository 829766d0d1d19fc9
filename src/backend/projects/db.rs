//! Database operations for projects
//!
//! This module contains database operations for projects and their members.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::shared::{ProjectId, UserId};

/// Project record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Create a project; the owner becomes its first member
pub async fn create_project(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    owner_id: UserId,
) -> Result<Project, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (name, description, owner_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, description, owner_id, created_at
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(owner_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_members (project_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(project.id)
        .bind(owner_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(project)
}

/// Get project by ID
pub async fn get_project(
    pool: &SqlitePool,
    project_id: ProjectId,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT id, name, description, owner_id, created_at FROM projects WHERE id = ?",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await
}

/// Projects a user is a member of
pub async fn list_projects_for_user(
    pool: &SqlitePool,
    user_id: UserId,
) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT p.id, p.name, p.description, p.owner_id, p.created_at
        FROM projects p
        JOIN project_members m ON m.project_id = p.id
        WHERE m.user_id = ?
        ORDER BY p.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Add a member
///
/// # Returns
/// `true` when the user was not a member before
pub async fn add_member(
    pool: &SqlitePool,
    project_id: ProjectId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO project_members (project_id, user_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a member; tasks of the project assigned to them become unassigned
///
/// # Returns
/// `true` when the user was a member
pub async fn remove_member(
    pool: &SqlitePool,
    project_id: ProjectId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE tasks SET assignee_id = NULL, updated_at = ? WHERE project_id = ? AND assignee_id = ?",
    )
    .bind(Utc::now())
    .bind(project_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Whether a user is a member of a project
pub async fn is_member(
    pool: &SqlitePool,
    project_id: ProjectId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ? AND user_id = ?)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Member ids of a project
pub async fn list_members(
    pool: &SqlitePool,
    project_id: ProjectId,
) -> Result<Vec<UserId>, sqlx::Error> {
    sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = ? ORDER BY user_id")
        .bind(project_id)
        .fetch_all(pool)
        .await
}

/// Total number of projects
pub async fn count_projects(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(pool)
        .await
}
