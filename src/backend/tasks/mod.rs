//! Tasks Module
//!
//! Tasks and the dependency graph between them. Every edge write goes
//! through `DependencyGuard`, which keeps each project's graph acyclic.
//!
//! # Module Structure
//!
//! ```text
//! tasks/
//! ├── mod.rs       - Module exports and documentation
//! ├── db.rs        - Task and edge database operations
//! ├── graph.rs     - In-memory graph and cycle detection
//! ├── guard.rs     - Serialized, transactional edge writer
//! └── handlers.rs  - Task edit/delete and dependency HTTP handlers
//! ```

pub mod db;
pub mod graph;
pub mod guard;
pub mod handlers;

pub use graph::{CycleError, DependencyGraph};
pub use guard::{DependencyGuard, EdgeChange};
