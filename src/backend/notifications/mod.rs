//! Notifications Module
//!
//! Per-user notifications: stored first, then pushed live to
//! `user.<id>.notifications` when the user has an open session.
//!
//! # Module Structure
//!
//! ```text
//! notifications/
//! ├── mod.rs       - Module exports and documentation
//! ├── db.rs        - Database operations
//! ├── service.rs   - NotificationService (persist + route)
//! └── handlers.rs  - HTTP handlers
//! ```

pub mod db;
pub mod handlers;
pub mod service;

pub use service::{Dispatched, EntityRef, NotificationKind, NotificationService};
