/**
 * Authentication Middleware
 *
 * This module protects routes that require an authenticated user. It
 * extracts and validates the bearer token from the Authorization header,
 * confirms the user still exists and is enabled, and hands the resulting
 * `Principal` to handlers through request extensions.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::auth::sessions::{bearer_token, TokenService};
use crate::backend::auth::users::{get_user_by_id, load_principal};
use crate::backend::error::BackendError;
use crate::backend::server::retry::retry_read;
use crate::backend::server::state::AppState;

/// Validate the `Authorization` header of a request
///
/// # Returns
/// The principal encoded in the token, or `AuthenticationFailure` when the
/// header is missing, not a bearer credential, or the token is invalid.
pub fn authenticate_request(
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<Principal, BackendError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!("[Auth] Missing Authorization header");
            BackendError::AuthenticationFailure
        })?;

    let token = bearer_token(header).ok_or_else(|| {
        tracing::debug!("[Auth] Invalid Authorization header format");
        BackendError::AuthenticationFailure
    })?;

    Ok(tokens.validate(token)?)
}

/// Authentication middleware
///
/// This middleware:
/// 1. Validates the bearer token
/// 2. Re-reads the user, rejecting deleted or disabled accounts
/// 3. Attaches the principal, with its current roles, to request extensions
///
/// Returns 401 when any step fails.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let claimed = authenticate_request(&app_state.tokens, request.headers())?;
    let principal = verify_active_user(&app_state.pool, claimed.id).await?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Load the principal of an existing, enabled user
///
/// Shared by HTTP requests and realtime handshakes, so a disabled or deleted
/// account loses both at once. Roles come from the store, not the token.
pub async fn verify_active_user(pool: &SqlitePool, user_id: i64) -> Result<Principal, BackendError> {
    let user = retry_read("load authenticated user", || get_user_by_id(pool, user_id))
        .await?
        .ok_or_else(|| {
            tracing::warn!("[Auth] Token for unknown user {}", user_id);
            BackendError::AuthenticationFailure
        })?;

    if !user.enabled {
        tracing::warn!("[Auth] Token for disabled user {}", user_id);
        return Err(BackendError::AuthenticationFailure);
    }

    Ok(retry_read("load roles", || load_principal(pool, &user)).await?)
}

/// Axum extractor for the authenticated principal
///
/// Use it on routes behind `auth_middleware`.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("[Auth] Principal not found in request extensions");
                BackendError::AuthenticationFailure
            })?;

        Ok(AuthUser(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::auth::principal::Role;

    #[test]
    fn test_authenticate_request() {
        let tokens = TokenService::new(b"secret", 60);
        let principal = Principal::new(3, "carol", [Role::Member]);
        let token = tokens.issue(&principal).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        assert_eq!(authenticate_request(&tokens, &headers).unwrap(), principal);
    }

    #[test]
    fn test_authenticate_request_failures() {
        let tokens = TokenService::new(b"secret", 60);

        let headers = HeaderMap::new();
        assert!(matches!(
            authenticate_request(&tokens, &headers),
            Err(BackendError::AuthenticationFailure)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(matches!(
            authenticate_request(&tokens, &headers),
            Err(BackendError::AuthenticationFailure)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer not.a.jwt".parse().unwrap());
        assert!(matches!(
            authenticate_request(&tokens, &headers),
            Err(BackendError::AuthenticationFailure)
        ));
    }
}
