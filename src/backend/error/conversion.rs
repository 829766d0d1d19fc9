/**
 * Error Conversion
 *
 * This module provides conversion implementations for backend errors,
 * allowing them to be converted to HTTP responses, and folds the error types
 * of individual components into `BackendError`.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 *
 * A cycle conflict additionally carries the offending edge and the path:
 * ```json
 * {
 *   "error": "Adding dependency 3 -> 1 would create a cycle",
 *   "status": 409,
 *   "dependent": 3,
 *   "prerequisite": 1,
 *   "cycle": [1, 2, 3]
 * }
 * ```
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::auth::codes::CodeError;
use crate::backend::auth::sessions::TokenError;
use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("[Backend] {} ({})", self, status.as_u16());
        }

        let mut body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        if let BackendError::CycleConflict(cycle) = &self {
            body["dependent"] = serde_json::json!(cycle.dependent());
            body["prerequisite"] = serde_json::json!(cycle.prerequisite());
            body["cycle"] = serde_json::json!(cycle.path());
        }

        (status, Json(body)).into_response()
    }
}

impl From<TokenError> for BackendError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => BackendError::AuthenticationFailure,
            TokenError::Issue(message) => BackendError::state(message),
        }
    }
}

impl From<CodeError> for BackendError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::ExpiredOrInvalid => {
                BackendError::handler(StatusCode::BAD_REQUEST, "Invalid or expired code")
            }
            CodeError::Store(err) => BackendError::Store(err),
        }
    }
}

impl From<bcrypt::BcryptError> for BackendError {
    fn from(err: bcrypt::BcryptError) -> Self {
        BackendError::state(format!("Password hashing failed: {}", err))
    }
}
