//! Middleware Module
//!
//! This module contains HTTP middleware for the backend server.
//!
//! # Architecture
//!
//! - **`auth`** - Bearer-token authentication for protected routes and the
//!   `AuthUser` extractor
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{middleware, Router};
//! use collabris::backend::middleware::auth_middleware;
//! use collabris::backend::server::state::AppState;
//!
//! # fn example(state: AppState, protected: Router<AppState>) -> Router<AppState> {
//! protected.layer(middleware::from_fn_with_state(state, auth_middleware))
//! # }
//! ```

pub mod auth;

pub use auth::{auth_middleware, authenticate_request, AuthUser};
