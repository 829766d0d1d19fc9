//! Collabris - Main Library
//!
//! Collabris is a project and task collaboration backend built with Rust.
//! Its engineering core is a real-time, authenticated messaging layer and a
//! transactional task-dependency graph.
//!
//! # Overview
//!
//! This library provides:
//! - Bearer-token authentication for HTTP requests and WebSocket handshakes
//! - A STOMP-style multiplexed WebSocket carrying chat, notification and
//!   dashboard-stat streams
//! - Per-destination authorization separate from connection authentication
//! - A broadcast router with global, room and directed-to-user addressing
//! - A cycle-free task dependency graph checked inside a transaction
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types shared by server and clients
//!   - Frame codec, destinations, broadcast events
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server and WebSocket endpoint
//!   - Authentication, realtime messaging, tasks, chat, notifications
//!   - SQLite persistence through sqlx
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the `backend` module and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use collabris::backend::server::{config::ServerConfig, init::create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env();
//! let app = create_app(config).await?;
//! // Serve `app` with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - The subscriber registry is a sharded `DashMap` of `broadcast::Sender`s
//! - Connections own their subscriptions; teardown unregisters before the
//!   socket is released
//! - The SQLite pool is shared across handlers

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
