/**
 * Signup Handler
 *
 * This module implements the user registration handler for POST /api/auth/signup.
 *
 * # Registration Process
 *
 * 1. Validate username, e-mail and password
 * 2. Reject taken usernames and e-mail addresses
 * 3. Hash the password with bcrypt
 * 4. Create the user, disabled, with the resolved roles
 * 5. Issue an e-mail verification code and mail it
 *
 * No token is returned; the account must be verified before sign in.
 */

use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::auth::codes::{issue_code, CodeKind};
use crate::backend::auth::handlers::types::{MessageResponse, SignupRequest};
use crate::backend::auth::principal::Role;
use crate::backend::auth::users::{
    create_user, get_user_by_email, get_user_by_username, hash_password, is_valid_username,
};
use crate::backend::error::BackendError;
use crate::backend::mail::Mail;
use crate::backend::server::state::AppState;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Sign up handler
///
/// # Errors
///
/// * `400 Bad Request` - Invalid input, username taken or e-mail in use
/// * `500 Internal Server Error` - Hashing or store failure
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, BackendError> {
    tracing::info!("Signup request for username: {}", request.username);

    if !is_valid_username(&request.username) {
        return Err(BackendError::validation(
            "username",
            "Username must be 3-30 chars, start with a letter, and contain only letters, numbers, and underscores",
        ));
    }

    if !request.email.contains('@') {
        return Err(BackendError::validation("email", "Invalid email format"));
    }

    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(BackendError::validation(
            "password",
            "Password must be at least 8 characters",
        ));
    }

    if get_user_by_username(&state.pool, &request.username).await?.is_some() {
        tracing::warn!("Username already exists: {}", request.username);
        return Err(BackendError::handler(
            StatusCode::BAD_REQUEST,
            "Username is already taken",
        ));
    }

    if get_user_by_email(&state.pool, &request.email).await?.is_some() {
        tracing::warn!("Email already exists: {}", request.email);
        return Err(BackendError::handler(
            StatusCode::BAD_REQUEST,
            "Email is already in use",
        ));
    }

    let password_hash = hash_password(&request.password, state.config.bcrypt_cost)?;
    let roles = Role::resolve_all(request.role.iter().map(String::as_str));

    let user = create_user(
        &state.pool,
        &request.username,
        &request.email,
        &password_hash,
        &roles,
    )
    .await?;

    let code = issue_code(&state.pool, user.id, CodeKind::EmailVerification).await?;
    if let Err(e) = state
        .mailer
        .send(Mail::email_verification(&user.email, &user.username, &code.code))
        .await
    {
        tracing::error!("Failed to send verification mail to {}: {}", user.email, e);
    }

    tracing::info!("User created: {} ({})", user.username, user.id);

    Ok(Json(MessageResponse::new(
        "User registered successfully! Please check your email to verify your account.",
    )))
}
