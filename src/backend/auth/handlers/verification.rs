/**
 * E-mail Verification Handlers
 *
 * - POST /api/auth/verify-email        consume a code and enable the account
 * - POST /api/auth/resend-verification issue a fresh code for a disabled account
 */

use axum::{extract::State, http::StatusCode, response::Json};

use crate::backend::auth::codes::{consume_code, issue_code, CodeError, CodeKind};
use crate::backend::auth::handlers::types::{EmailRequest, MessageResponse, VerifyEmailRequest};
use crate::backend::auth::users::{get_user_by_email, set_enabled};
use crate::backend::error::BackendError;
use crate::backend::mail::Mail;
use crate::backend::server::state::AppState;

/// Verify e-mail handler
///
/// # Errors
///
/// * `400 Bad Request` - Unknown, expired or already used code
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, BackendError> {
    let code = request.code.trim().to_ascii_uppercase();

    let user_id = consume_code(&state.pool, &code, CodeKind::EmailVerification)
        .await
        .map_err(|e| match e {
            CodeError::ExpiredOrInvalid => BackendError::handler(
                StatusCode::BAD_REQUEST,
                "Invalid or expired verification code.",
            ),
            other => other.into(),
        })?;

    set_enabled(&state.pool, user_id, true).await?;
    tracing::info!("User {} verified their email", user_id);

    Ok(Json(MessageResponse::new(
        "Email verified successfully! You can now log in.",
    )))
}

/// Resend verification handler
///
/// # Errors
///
/// * `404 Not Found` - No account with this e-mail
/// * `400 Bad Request` - Account already verified
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, BackendError> {
    let user = get_user_by_email(&state.pool, &request.email)
        .await?
        .ok_or_else(|| BackendError::not_found("No account found with this email address."))?;

    if user.enabled {
        return Err(BackendError::handler(
            StatusCode::BAD_REQUEST,
            "This account is already verified.",
        ));
    }

    let code = issue_code(&state.pool, user.id, CodeKind::EmailVerification).await?;
    if let Err(e) = state
        .mailer
        .send(Mail::email_verification(&user.email, &user.username, &code.code))
        .await
    {
        tracing::error!("Failed to send verification mail to {}: {}", user.email, e);
    }

    Ok(Json(MessageResponse::new(
        "Verification email sent! Please check your email.",
    )))
}
