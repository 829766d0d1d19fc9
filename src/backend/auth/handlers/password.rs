/**
 * Password Reset Handlers
 *
 * - POST /api/auth/forgot-password mails a reset code to enabled accounts;
 *   the response is identical whether or not the account exists
 * - POST /api/auth/reset-password  spends the code and replaces the password
 */

use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::auth::codes::{consume_code_for_user, issue_code, CodeError, CodeKind};
use crate::backend::auth::handlers::signup::MIN_PASSWORD_LEN;
use crate::backend::auth::handlers::types::{EmailRequest, MessageResponse, ResetPasswordRequest};
use crate::backend::auth::users::{get_user_by_email, hash_password, update_password};
use crate::backend::error::BackendError;
use crate::backend::mail::Mail;
use crate::backend::server::state::AppState;

const FORGOT_PASSWORD_REPLY: &str =
    "If an account with this email exists, a password reset code will be sent.";

fn invalid_reset_code() -> BackendError {
    BackendError::handler(StatusCode::BAD_REQUEST, "Invalid or expired reset code.")
}

/// Forgot password handler
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, BackendError> {
    if let Some(user) = get_user_by_email(&state.pool, &request.email).await? {
        if user.enabled {
            let code = issue_code(&state.pool, user.id, CodeKind::PasswordReset).await?;
            if let Err(e) = state
                .mailer
                .send(Mail::password_reset(&user.email, &user.username, &code.code))
                .await
            {
                tracing::error!("Failed to send reset mail to {}: {}", user.email, e);
            }
        } else {
            tracing::debug!("Password reset requested for disabled user {}", user.id);
        }
    }

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_REPLY)))
}

/// Reset password handler
///
/// # Errors
///
/// * `400 Bad Request` - Weak password, or the code is unknown, expired,
///   used, or belongs to another account
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, BackendError> {
    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(BackendError::validation(
            "new_password",
            "Password must be at least 8 characters",
        ));
    }

    let user = get_user_by_email(&state.pool, &request.email)
        .await?
        .ok_or_else(invalid_reset_code)?;

    let code = request.code.trim().to_ascii_uppercase();
    consume_code_for_user(&state.pool, user.id, &code, CodeKind::PasswordReset)
        .await
        .map_err(|e| match e {
            CodeError::ExpiredOrInvalid => invalid_reset_code(),
            other => other.into(),
        })?;

    let password_hash = hash_password(&request.new_password, state.config.bcrypt_cost)?;
    update_password(&state.pool, user.id, &password_hash).await?;
    tracing::info!("Password reset for user {}", user.id);

    Ok(Json(MessageResponse::new(
        "Password reset successfully! You can now log in.",
    )))
}
