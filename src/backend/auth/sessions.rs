/**
 * Session Tokens
 *
 * This module issues and validates the HS256 bearer tokens carried in the
 * `Authorization` header of HTTP requests and of the realtime CONNECT frame.
 *
 * Tokens are stateless: there is no revocation list, a token is valid until
 * its `exp` claim. A token is expired at the exact second of `exp`.
 */

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::auth::principal::{Principal, Role};

/// Default token lifetime: 24 hours
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username at issue time
    pub username: String,
    /// Authority strings (`ROLE_*`)
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token errors
///
/// Every validation failure is `Invalid`; bad signature, expiry and
/// malformed input are not distinguished.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,

    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    /// Create a token service
    ///
    /// # Arguments
    /// * `secret` - HMAC secret shared by issuer and validator
    /// * `ttl_secs` - Lifetime of issued tokens
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is compared manually so that `exp == now` counts as expired
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for a principal, valid from now
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue_at(principal, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, principal: &Principal, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            roles: principal.authorities(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Validate a token and recover its principal
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        self.validate_at(token, chrono::Utc::now().timestamp())
    }

    /// Validate a token as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("[Auth] Token rejected: {}", e);
            TokenError::Invalid
        })?;
        let claims = data.claims;

        if claims.exp <= now {
            tracing::debug!("[Auth] Token expired at {} (now {})", claims.exp, now);
            return Err(TokenError::Invalid);
        }

        let id: i64 = claims.sub.parse().map_err(|_| {
            tracing::debug!("[Auth] Token subject is not a user id: {:?}", claims.sub);
            TokenError::Invalid
        })?;

        let roles = claims
            .roles
            .iter()
            .filter_map(|authority| Role::from_authority(authority));

        Ok(Principal::new(id, claims.username, roles))
    }
}

/// Extract the token from an `Authorization` value of the form `Bearer <token>`
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", 3600)
    }

    fn alice() -> Principal {
        Principal::new(7, "alice", [Role::Manager, Role::Member])
    }

    #[test]
    fn test_issue_and_validate() {
        let svc = service();
        let token = svc.issue(&alice()).unwrap();
        let principal = svc.validate(&token).unwrap();
        assert_eq!(principal, alice());
    }

    #[test]
    fn test_expiry_boundary() {
        let svc = service();
        let issued_at = 1_700_000_000;
        let token = svc.issue_at(&alice(), issued_at).unwrap();

        assert!(svc.validate_at(&token, issued_at + 3599).is_ok());
        assert_eq!(svc.validate_at(&token, issued_at + 3600), Err(TokenError::Invalid));
        assert_eq!(svc.validate_at(&token, issued_at + 3601), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(&alice()).unwrap();
        let other = TokenService::new(b"another-secret", 3600);
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert_eq!(service().validate("invalid.token.here"), Err(TokenError::Invalid));
        assert_eq!(service().validate(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let svc = service();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "not-a-number".to_string(),
            username: "mallory".to_string(),
            roles: vec![],
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(svc.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
