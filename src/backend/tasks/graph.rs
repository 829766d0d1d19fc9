/**
 * Dependency Graph
 *
 * In-memory view of one project's dependency edges, used to decide whether
 * a new edge keeps the graph acyclic.
 *
 * An edge `dependent -> prerequisite` reads "dependent waits on
 * prerequisite". Adding it closes a cycle exactly when `dependent` is
 * already reachable from `prerequisite` along prerequisite edges.
 */

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::shared::TaskId;

/// Rejected dependency edge
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// A task cannot wait on itself
    #[error("Task {task} cannot depend on itself")]
    SelfLoop { task: TaskId },

    /// The edge would close a cycle
    ///
    /// `cycle` is the existing path from `prerequisite` to `dependent`.
    #[error("Adding dependency {dependent} -> {prerequisite} would create a cycle")]
    WouldCloseCycle {
        dependent: TaskId,
        prerequisite: TaskId,
        cycle: Vec<TaskId>,
    },
}

impl CycleError {
    pub fn dependent(&self) -> TaskId {
        match self {
            CycleError::SelfLoop { task } => *task,
            CycleError::WouldCloseCycle { dependent, .. } => *dependent,
        }
    }

    pub fn prerequisite(&self) -> TaskId {
        match self {
            CycleError::SelfLoop { task } => *task,
            CycleError::WouldCloseCycle { prerequisite, .. } => *prerequisite,
        }
    }

    /// Tasks on the cycle the edge would close
    pub fn path(&self) -> Vec<TaskId> {
        match self {
            CycleError::SelfLoop { task } => vec![*task],
            CycleError::WouldCloseCycle { cycle, .. } => cycle.clone(),
        }
    }
}

/// Adjacency list keyed by dependent task
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    prerequisites: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(dependent, prerequisite)` pairs
    pub fn from_edges(edges: impl IntoIterator<Item = (TaskId, TaskId)>) -> Self {
        let mut graph = Self::new();
        for (dependent, prerequisite) in edges {
            graph.insert(dependent, prerequisite);
        }
        graph
    }

    /// Add an edge without checking it
    pub fn insert(&mut self, dependent: TaskId, prerequisite: TaskId) {
        let prerequisites = self.prerequisites.entry(dependent).or_default();
        if !prerequisites.contains(&prerequisite) {
            prerequisites.push(prerequisite);
        }
    }

    pub fn contains(&self, dependent: TaskId, prerequisite: TaskId) -> bool {
        self.prerequisites
            .get(&dependent)
            .is_some_and(|p| p.contains(&prerequisite))
    }

    pub fn edge_count(&self) -> usize {
        self.prerequisites.values().map(Vec::len).sum()
    }

    /// Path from `from` to `to` along prerequisite edges, both ends included
    ///
    /// Iterative depth-first search with an explicit visited set, so deep
    /// chains cannot overflow the stack.
    pub fn find_path(&self, from: TaskId, to: TaskId) -> Option<Vec<TaskId>> {
        let mut visited = HashSet::from([from]);
        let mut parent: HashMap<TaskId, TaskId> = HashMap::new();
        let mut stack = vec![from];

        while let Some(task) = stack.pop() {
            if task == to {
                let mut path = vec![to];
                let mut current = to;
                while let Some(&previous) = parent.get(&current) {
                    path.push(previous);
                    current = previous;
                }
                path.reverse();
                return Some(path);
            }

            for &next in self.prerequisites.get(&task).into_iter().flatten() {
                if visited.insert(next) {
                    parent.insert(next, task);
                    stack.push(next);
                }
            }
        }
        None
    }

    /// Check that `dependent -> prerequisite` keeps the graph acyclic
    pub fn check_edge(&self, dependent: TaskId, prerequisite: TaskId) -> Result<(), CycleError> {
        if dependent == prerequisite {
            return Err(CycleError::SelfLoop { task: dependent });
        }
        match self.find_path(prerequisite, dependent) {
            Some(cycle) => Err(CycleError::WouldCloseCycle {
                dependent,
                prerequisite,
                cycle,
            }),
            None => Ok(()),
        }
    }
}
