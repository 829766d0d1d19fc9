//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! These errors are used in HTTP handlers and can be converted to HTTP responses.
//!
//! # Architecture
//!
//! - **`types`** - Error type definitions, constructors and retry classification
//! - **`conversion`** - `IntoResponse` and conversions from component errors
//!
//! # Error Kinds
//!
//! - `AuthenticationFailure` - Missing, invalid or expired credential (401)
//! - `AuthorizationDenied` - Authenticated but not permitted (403)
//! - `CycleConflict` - Dependency edge would close a cycle (409)
//! - `NotFound` - Referenced entity does not exist (404)
//! - `SharedError` - Validation and serialization errors from the shared module
//! - `Store` - Persistence failure; transient ones map to 503
//! - `HandlerError` - Any other handler failure with an explicit status
//!
//! # HTTP Response Conversion
//!
//! All backend errors implement `IntoResponse` from Axum, allowing them to be
//! returned directly from handlers.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;
