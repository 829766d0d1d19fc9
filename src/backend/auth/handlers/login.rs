/**
 * Sign In Handler
 *
 * This module implements the user authentication handler for POST /api/auth/signin.
 *
 * # Authentication Process
 *
 * 1. Look up the user by username, then by e-mail
 * 2. Verify the password with bcrypt
 * 3. Refuse accounts whose e-mail is not verified yet (403)
 * 4. Issue a bearer token carrying the user's roles
 *
 * Unknown users and wrong passwords produce the same 401.
 */

use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::auth::handlers::types::{JwtResponse, SigninRequest};
use crate::backend::auth::users::{get_user_by_login, load_principal, verify_password};
use crate::backend::error::BackendError;
use crate::backend::server::retry::retry_read;
use crate::backend::server::state::AppState;

fn bad_credentials() -> BackendError {
    BackendError::handler(StatusCode::UNAUTHORIZED, "Invalid username or password")
}

/// Sign in handler
///
/// # Errors
///
/// * `401 Unauthorized` - Unknown user or wrong password
/// * `403 Forbidden` - E-mail not verified
pub async fn signin(
    State(state): State<AppState>,
    Json(request): Json<SigninRequest>,
) -> Result<Json<JwtResponse>, BackendError> {
    tracing::info!("Signin request for: {}", request.username);

    let user = retry_read("signin lookup", || get_user_by_login(&state.pool, &request.username))
        .await?
        .ok_or_else(|| {
            tracing::warn!("User not found: {}", request.username);
            bad_credentials()
        })?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!("Invalid password for user: {}", request.username);
        return Err(bad_credentials());
    }

    if !user.enabled {
        return Err(BackendError::forbidden(
            "Please verify your email before logging in.",
        ));
    }

    let principal = load_principal(&state.pool, &user).await?;
    let token = state.tokens.issue(&principal)?;

    tracing::info!("User signed in: {} ({})", user.username, user.id);

    Ok(Json(JwtResponse::new(token, &user, &principal)))
}
