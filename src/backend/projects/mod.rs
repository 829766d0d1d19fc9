//! Projects Module
//!
//! Projects group members, tasks and a chat room. Membership gates every
//! project-scoped HTTP route and the realtime `room.<id>` destination.
//!
//! # Module Structure
//!
//! ```text
//! projects/
//! ├── mod.rs       - Module exports and documentation
//! ├── db.rs        - Project and membership database operations
//! ├── access.rs    - Membership and ownership checks
//! └── handlers.rs  - HTTP handlers
//! ```

pub mod access;
pub mod db;
pub mod handlers;

pub use access::ensure_member;
pub use db::Project;
