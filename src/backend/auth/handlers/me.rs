/**
 * Get Current User Handler
 *
 * GET /api/auth/me returns the authenticated user without sensitive data.
 * The route sits behind `auth_middleware`, so the principal is already
 * validated when the handler runs.
 */

use axum::{extract::State, response::Json};
use sqlx::SqlitePool;

use crate::backend::auth::handlers::types::UserResponse;
use crate::backend::auth::users::get_user_by_id;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;

/// Get current user handler
///
/// # Errors
///
/// * `401 Unauthorized` - Missing principal
/// * `404 Not Found` - User deleted since the request was authenticated
pub async fn get_me(
    State(pool): State<SqlitePool>,
    AuthUser(principal): AuthUser,
) -> Result<Json<UserResponse>, BackendError> {
    let user = get_user_by_id(&pool, principal.id)
        .await?
        .ok_or_else(|| BackendError::not_found(format!("User {} not found", principal.id)))?;

    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        enabled: user.enabled,
        roles: principal.authorities(),
    }))
}
