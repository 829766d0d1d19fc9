//! Server Module
//!
//! This module contains all server-side code for initializing and configuring
//! the Axum HTTP server. It provides the foundation for the application's
//! backend infrastructure.
//!
//! # Architecture
//!
//! The server module is organized into focused submodules:
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Environment configuration and database loading
//! - **`init`** - Server initialization, background tasks and app creation
//! - **`retry`** - Bounded retries for idempotent store reads
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading
//! ├── init.rs         - Server initialization and app creation
//! └── retry.rs        - Store read retries
//! ```
//!
//! # State Management
//!
//! The server uses `AppState` as the central state container, which holds:
//! - The SQLite pool
//! - The token service
//! - The broadcast router and its subscriber registry
//! - The dependency guard
//! - The mailer and the configuration
//!
//! Every member is cheap to clone; shared parts sit behind `Arc`.
//!
//! # Example
//!
//! ```rust,no_run
//! use collabris::backend::server::{config::ServerConfig, create_app};
//!
//! # async fn example() -> Result<(), sqlx::Error> {
//! let app = create_app(ServerConfig::from_env()).await?;
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

/// Store read retries
pub mod retry;

// Re-export commonly used types
pub use init::create_app;
pub use state::AppState;
