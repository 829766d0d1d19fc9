/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * These errors are used in HTTP handlers and can be converted to HTTP responses.
 *
 * # Error Categories
 *
 * ## Access Errors
 *
 * - `AuthenticationFailure` - the caller could not be identified. The
 *   message is the same whether the token was expired, forged or malformed.
 * - `AuthorizationDenied` - the caller is known but not allowed.
 *
 * ## Domain Errors
 *
 * - `CycleConflict` - a dependency edge was rejected by the graph guard
 * - `NotFound` - a referenced entity is missing
 * - `SharedError` - validation failures
 *
 * ## Store Errors
 *
 * `Store` wraps `sqlx::Error`. Pool timeouts, I/O errors and SQLite
 * busy/locked conditions are transient and surface as 503; everything else
 * is a 500.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::tasks::graph::CycleError;
use crate::shared::SharedError;

/// Message returned for every authentication failure
pub const SIGN_IN_AGAIN: &str = "Please sign in again";

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use collabris::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// let err = BackendError::forbidden("Not a member of this project");
/// let err = BackendError::not_found("Task 7 not found");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Missing, invalid or expired credential
    #[error("{}", SIGN_IN_AGAIN)]
    AuthenticationFailure,

    /// Authenticated principal lacks permission for the action
    #[error("Access denied: {message}")]
    AuthorizationDenied {
        /// Human-readable error message
        message: String,
    },

    /// Dependency edge rejected because it would create a cycle
    #[error(transparent)]
    CycleConflict(#[from] CycleError),

    /// Referenced entity does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message
        message: String,
    },

    /// Handler error with an explicit status
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// State management error
    #[error("State error: {message}")]
    StateError {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (validation, serialization, destination)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a new state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::StateError {
            message: message.into(),
        }
    }

    /// Create an authorization denial
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a validation error for a request field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SharedError(SharedError::validation(field, message))
    }

    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => is_transient_store_error(err),
            _ => false,
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `AuthenticationFailure` - 401
    /// - `AuthorizationDenied` - 403
    /// - `CycleConflict` - 409
    /// - `NotFound` - 404
    /// - `HandlerError` - Uses the status code from the error
    /// - `SharedError` - 400 for validation and destination errors, 500 otherwise
    /// - `Store` - 503 when transient, 500 otherwise
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            Self::CycleConflict(_) => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::HandlerError { status, .. } => *status,
            Self::StateError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::DestinationError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(err) if is_transient_store_error(err) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Store errors are reported generically; the underlying error is logged
    /// where it happens.
    pub fn message(&self) -> String {
        match self {
            Self::AuthenticationFailure => SIGN_IN_AGAIN.to_string(),
            Self::AuthorizationDenied { message } => message.clone(),
            Self::CycleConflict(err) => err.to_string(),
            Self::NotFound { message } => message.clone(),
            Self::HandlerError { message, .. } => message.clone(),
            Self::StateError { message } => message.clone(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
            Self::Store(err) if is_transient_store_error(err) => {
                "Service temporarily unavailable".to_string()
            }
            Self::Store(_) => "Internal server error".to_string(),
        }
    }
}

/// Whether a store error is worth retrying
///
/// Transient: I/O, pool timeout or closed pool mid-flight, and SQLite
/// `SQLITE_BUSY` / `SQLITE_LOCKED` (including their extended codes).
pub fn is_transient_store_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}
