//! Database operations for tasks and dependency edges
//!
//! Edge helpers take any SQLite executor so the dependency guard can run
//! them inside its transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::shared::{ProjectId, TaskId, UserId};

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// Task record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<UserId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, assignee_id, created_by, created_at, updated_at";

/// Create a task in `TODO`
pub async fn create_task(
    pool: &SqlitePool,
    project_id: ProjectId,
    title: &str,
    description: Option<&str>,
    assignee_id: Option<UserId>,
    created_by: UserId,
) -> Result<Task, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO tasks (project_id, title, description, status, assignee_id, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(project_id)
    .bind(title)
    .bind(description)
    .bind(TaskStatus::Todo)
    .bind(assignee_id)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Get task by ID
pub async fn get_task(pool: &SqlitePool, task_id: TaskId) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
        .bind(task_id)
        .fetch_optional(pool)
        .await
}

/// Overwrite the editable fields of a task
///
/// # Returns
/// The updated task, `None` if it no longer exists
pub async fn update_task(
    pool: &SqlitePool,
    task_id: TaskId,
    title: &str,
    description: Option<&str>,
    status: TaskStatus,
    assignee_id: Option<UserId>,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, status = ?, assignee_id = ?, updated_at = ?
        WHERE id = ?
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(title)
    .bind(description)
    .bind(status)
    .bind(assignee_id)
    .bind(Utc::now())
    .bind(task_id)
    .fetch_optional(pool)
    .await
}

/// Delete a task; its dependency edges go with it
///
/// # Returns
/// `true` when a task was removed
pub async fn delete_task<'e>(
    executor: impl SqliteExecutor<'e>,
    task_id: TaskId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Tasks of a project in creation order
pub async fn list_project_tasks(
    pool: &SqlitePool,
    project_id: ProjectId,
) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? ORDER BY id"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/// Prerequisites of a task
pub async fn list_prerequisites(
    pool: &SqlitePool,
    task_id: TaskId,
) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        r#"
        SELECT t.id, t.project_id, t.title, t.description, t.status, t.assignee_id,
               t.created_by, t.created_at, t.updated_at
        FROM task_dependencies d
        JOIN tasks t ON t.id = d.prerequisite_id
        WHERE d.dependent_id = ?
        ORDER BY t.id
        "#,
    )
    .bind(task_id)
    .fetch_all(pool)
    .await
}

/// Every `(dependent, prerequisite)` edge between tasks of a project
pub async fn load_project_edges<'e>(
    executor: impl SqliteExecutor<'e>,
    project_id: ProjectId,
) -> Result<Vec<(TaskId, TaskId)>, sqlx::Error> {
    sqlx::query_as::<_, (TaskId, TaskId)>(
        r#"
        SELECT d.dependent_id, d.prerequisite_id
        FROM task_dependencies d
        JOIN tasks t ON t.id = d.dependent_id
        WHERE t.project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_all(executor)
    .await
}

/// Store an edge
pub async fn insert_edge<'e>(
    executor: impl SqliteExecutor<'e>,
    dependent: TaskId,
    prerequisite: TaskId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO task_dependencies (dependent_id, prerequisite_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(dependent)
    .bind(prerequisite)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete an edge
///
/// # Returns
/// `true` when an edge was removed
pub async fn delete_edge<'e>(
    executor: impl SqliteExecutor<'e>,
    dependent: TaskId,
    prerequisite: TaskId,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM task_dependencies WHERE dependent_id = ? AND prerequisite_id = ?")
            .bind(dependent)
            .bind(prerequisite)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Total number of tasks
pub async fn count_tasks(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(pool)
        .await
}

/// Number of tasks in each status
pub async fn count_tasks_by_status(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM tasks GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await
}

/// Total number of dependency edges
pub async fn count_dependencies(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM task_dependencies")
        .fetch_one(pool)
        .await
}
