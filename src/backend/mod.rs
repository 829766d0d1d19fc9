//! Backend Module
//!
//! This module contains all server-side code for Collabris. It provides an
//! Axum HTTP server with a multiplexed WebSocket endpoint, token-based
//! authentication and a transactional task-dependency graph.
//!
//! # Overview
//!
//! The backend module includes:
//! - Axum HTTP server setup and configuration
//! - Bearer-token and verification-code services
//! - The realtime messaging core (gatekeeper, authorizer, router)
//! - Task dependency graph with cycle detection
//! - Chat, notification and dashboard emitters
//! - SQLite persistence through sqlx
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`auth`** - Principals, bearer tokens, verification codes, users
//! - **`middleware`** - Request authentication
//! - **`realtime`** - WebSocket sessions, subscriber registry, broadcast router
//! - **`tasks`** - Tasks and the dependency graph guard
//! - **`projects`** - Projects and membership
//! - **`chat`** - Chat rooms keyed by project
//! - **`notifications`** - Persisted, directed notifications
//! - **`dashboard`** - Aggregate statistics
//! - **`mail`** - Outgoing mail abstraction
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── auth/           - Authentication
//! ├── middleware/     - Request middleware
//! ├── realtime/       - Multiplexed connection and fan-out
//! ├── tasks/          - Tasks and dependency guard
//! ├── projects/       - Projects and members
//! ├── chat/           - Chat persistence and service
//! ├── notifications/  - Notification persistence and service
//! ├── dashboard/      - Statistics
//! ├── mail.rs         - Mailer trait
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! The backend uses shared state (`AppState`) that contains:
//! - The SQLite connection pool
//! - The token service
//! - The subscriber registry and broadcast router
//! - The dependency guard's per-project locks
//! - Server configuration
//!
//! Sub-states are extracted by handlers through axum's `FromRef`.
//!
//! # Thread Safety
//!
//! - `DashMap` for the sharded subscriber registry and per-project locks
//! - `broadcast::Sender` per destination for ordered fan-out
//! - Axum handlers are `Send + Sync`
//! - Database pool is thread-safe
//!
//! # Error Handling
//!
//! Handlers return `Result<_, BackendError>`; the error converts into a JSON
//! response with the matching HTTP status.

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Authentication and user management
#[cfg(feature = "ssr")]
pub mod auth;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Realtime messaging core
#[cfg(feature = "ssr")]
pub mod realtime;

/// Tasks and dependency graph
#[cfg(feature = "ssr")]
pub mod tasks;

/// Projects and membership
#[cfg(feature = "ssr")]
pub mod projects;

/// Chat rooms
#[cfg(feature = "ssr")]
pub mod chat;

/// Directed notifications
#[cfg(feature = "ssr")]
pub mod notifications;

/// Dashboard statistics
#[cfg(feature = "ssr")]
pub mod dashboard;

/// Outgoing mail
#[cfg(feature = "ssr")]
pub mod mail;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use server::create_app;
#[cfg(feature = "ssr")]
pub use realtime::{BroadcastRouter, DeliveryOutcome, SubscriberRegistry};
