//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//! Routes are organized by functionality into focused submodules.
//!
//! # Architecture
//!
//! - **`router`** - Main router creation and route assembly
//! - **`api_routes`** - Public and protected API endpoints
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! └── api_routes.rs   - API endpoint handlers
//! ```
//!
//! # Authentication
//!
//! Protected routes sit behind `auth_middleware`, which answers 401 before
//! the handler runs. The `/ws` upgrade is public: the realtime gatekeeper
//! authenticates the CONNECT frame instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use collabris::backend::mail::LogMailer;
//! use collabris::backend::routes::create_router;
//! use collabris::backend::server::{config::ServerConfig, AppState};
//!
//! # async fn example(pool: sqlx::SqlitePool) {
//! let state = AppState::new(pool, ServerConfig::default(), Arc::new(LogMailer));
//! let router = create_router(state);
//! # }
//! ```

/// Main router creation
pub mod router;

/// API endpoint handlers
pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
