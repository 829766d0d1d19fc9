/**
 * Dependency Graph Guard
 *
 * The only writer of dependency edges. Adding an edge checks for cycles and
 * inserts under a per-project async mutex and inside one store
 * transaction, so two concurrent inserts of `a -> b` and `b -> a` can never
 * both succeed.
 *
 * # Rules
 *
 * - `dependent == prerequisite` is a `CycleConflict`
 * - Both tasks must exist (404) and belong to the same project (400)
 * - An existing edge is accepted again without change
 * - Removing an edge never needs a check
 * - Deleting a task takes the project lock; its edges cascade with it
 *
 * A project's mutex lives in the lock table only while someone holds or
 * waits on it.
 */

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::backend::error::BackendError;
use crate::backend::server::retry::retry_read;
use crate::backend::tasks::db::{
    delete_edge, delete_task, get_task, insert_edge, list_prerequisites, load_project_edges, Task,
};
use crate::backend::tasks::graph::{CycleError, DependencyGraph};
use crate::shared::{ProjectId, TaskId};

/// Whether `add_dependency` stored a new edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Created,
    AlreadyPresent,
}

/// Serializes dependency writes per project
pub struct DependencyGuard {
    pool: SqlitePool,
    locks: DashMap<ProjectId, Arc<Mutex<()>>>,
}

impl DependencyGuard {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: DashMap::new(),
        }
    }

    fn project_lock(&self, project_id: ProjectId) -> Arc<Mutex<()>> {
        self.locks.entry(project_id).or_default().value().clone()
    }

    /// Drop the table entry once the caller's handle is gone and nobody else holds one
    fn release_lock(&self, project_id: ProjectId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(&project_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of projects with a live lock entry
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    async fn load_task(&self, task_id: TaskId) -> Result<Task, BackendError> {
        retry_read("load task", || get_task(&self.pool, task_id))
            .await?
            .ok_or_else(|| BackendError::not_found(format!("Task {} not found", task_id)))
    }

    /// Record that `dependent` waits on `prerequisite`
    ///
    /// # Errors
    /// * `CycleConflict` - Self-loop, or the edge would close a cycle
    /// * `NotFound` - Either task does not exist
    /// * `SharedError` (400) - Tasks belong to different projects
    pub async fn add_dependency(
        &self,
        dependent: TaskId,
        prerequisite: TaskId,
    ) -> Result<EdgeChange, BackendError> {
        if dependent == prerequisite {
            return Err(CycleError::SelfLoop { task: dependent }.into());
        }

        let dependent_task = self.load_task(dependent).await?;
        let prerequisite_task = self.load_task(prerequisite).await?;
        if dependent_task.project_id != prerequisite_task.project_id {
            return Err(BackendError::validation(
                "dependencyId",
                "Tasks must belong to the same project",
            ));
        }
        let project_id = dependent_task.project_id;

        let lock = self.project_lock(project_id);
        let result = {
            let _held = lock.lock().await;
            self.insert_checked(project_id, dependent, prerequisite).await
        };
        self.release_lock(project_id, lock);
        result
    }

    async fn insert_checked(
        &self,
        project_id: ProjectId,
        dependent: TaskId,
        prerequisite: TaskId,
    ) -> Result<EdgeChange, BackendError> {
        let mut tx = self.pool.begin().await?;
        let graph = DependencyGraph::from_edges(load_project_edges(&mut *tx, project_id).await?);

        if graph.contains(dependent, prerequisite) {
            tx.rollback().await?;
            tracing::debug!("[Tasks] Dependency {} -> {} already present", dependent, prerequisite);
            return Ok(EdgeChange::AlreadyPresent);
        }

        if let Err(cycle) = graph.check_edge(dependent, prerequisite) {
            tx.rollback().await?;
            tracing::info!("[Tasks] Rejected dependency in project {}: {}", project_id, cycle);
            return Err(cycle.into());
        }

        insert_edge(&mut *tx, dependent, prerequisite).await?;
        tx.commit().await?;

        tracing::info!(
            "[Tasks] Task {} now depends on task {} (project {})",
            dependent,
            prerequisite,
            project_id
        );
        Ok(EdgeChange::Created)
    }

    /// Delete a task together with every edge touching it
    ///
    /// # Returns
    /// `true` when the task was removed
    pub async fn delete_task(&self, task: &Task) -> Result<bool, BackendError> {
        let lock = self.project_lock(task.project_id);
        let result = {
            let _held = lock.lock().await;
            delete_task(&self.pool, task.id).await
        };
        self.release_lock(task.project_id, lock);

        let removed = result?;
        if removed {
            tracing::info!("[Tasks] Deleted task {} (project {})", task.id, task.project_id);
        }
        Ok(removed)
    }

    /// Delete an edge if it exists
    ///
    /// # Returns
    /// `true` when an edge was removed
    pub async fn remove_dependency(
        &self,
        dependent: TaskId,
        prerequisite: TaskId,
    ) -> Result<bool, BackendError> {
        let removed = delete_edge(&self.pool, dependent, prerequisite).await?;
        if removed {
            tracing::info!("[Tasks] Removed dependency {} -> {}", dependent, prerequisite);
        }
        Ok(removed)
    }

    /// Prerequisites of a task
    pub async fn prerequisites(&self, task_id: TaskId) -> Result<Vec<Task>, BackendError> {
        self.load_task(task_id).await?;
        Ok(retry_read("list prerequisites", || list_prerequisites(&self.pool, task_id)).await?)
    }
}
