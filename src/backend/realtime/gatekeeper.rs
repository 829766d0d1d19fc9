/**
 * Connection Gatekeeper
 *
 * Authenticates the CONNECT frame that opens every realtime connection.
 * The credential is the frame's `Authorization: Bearer <token>` header; the
 * header name is matched without regard to case. A valid token is not
 * enough: the account must still exist and be enabled, the same check the
 * HTTP middleware runs.
 *
 * # Policies
 *
 * - `Reject` (default): a missing or invalid credential closes the
 *   connection after an ERROR frame, no CONNECTED is sent
 * - `Anonymous`: the connection is acknowledged but stays unauthenticated,
 *   so the authorizer denies every SUBSCRIBE and SEND on it
 */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::auth::sessions::{bearer_token, TokenError, TokenService};
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::verify_active_user;
use crate::shared::Frame;

/// What to do with a CONNECT frame that fails authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePolicy {
    #[default]
    Reject,
    Anonymous,
}

impl fmt::Display for HandshakePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakePolicy::Reject => f.write_str("reject"),
            HandshakePolicy::Anonymous => f.write_str("anonymous"),
        }
    }
}

impl FromStr for HandshakePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(HandshakePolicy::Reject),
            "anonymous" => Ok(HandshakePolicy::Anonymous),
            other => Err(format!("unknown handshake policy: {}", other)),
        }
    }
}

/// Result of a handshake
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// Credential valid; bind this principal
    Accepted(Principal),
    /// Credential missing or invalid, connection kept unauthenticated
    Anonymous,
    /// Credential missing or invalid, connection must close
    Rejected,
}

/// Authenticates realtime handshakes
#[derive(Clone)]
pub struct Gatekeeper {
    tokens: Arc<TokenService>,
    pool: SqlitePool,
    policy: HandshakePolicy,
}

impl Gatekeeper {
    pub fn new(tokens: Arc<TokenService>, pool: SqlitePool, policy: HandshakePolicy) -> Self {
        Self {
            tokens,
            pool,
            policy,
        }
    }

    pub fn policy(&self) -> HandshakePolicy {
        self.policy
    }

    /// Validate the bearer credential carried by a CONNECT frame
    ///
    /// # Errors
    /// `TokenError::Invalid` when the header is missing, is not a bearer
    /// credential, or the token does not validate.
    pub fn verify_token(&self, frame: &Frame) -> Result<Principal, TokenError> {
        let header = frame
            .get_ignore_case("authorization")
            .ok_or(TokenError::Invalid)?;
        let token = bearer_token(header).ok_or(TokenError::Invalid)?;
        self.tokens.validate(token)
    }

    /// Authenticate a CONNECT frame against the token and the user store
    ///
    /// # Errors
    /// * `AuthenticationFailure` - Bad token, unknown or disabled account
    /// * `Store` - The account could not be loaded after retries
    pub async fn authenticate(&self, frame: &Frame) -> Result<Principal, BackendError> {
        let claimed = self.verify_token(frame)?;
        verify_active_user(&self.pool, claimed.id).await
    }

    /// Apply the handshake policy to a CONNECT frame
    ///
    /// Every failure, store errors included, ends in `Rejected` or
    /// `Anonymous`; nothing escapes to the connection loop.
    pub async fn handshake(&self, frame: &Frame) -> HandshakeOutcome {
        match self.authenticate(frame).await {
            Ok(principal) => {
                tracing::info!(
                    "[Gatekeeper] Handshake accepted for {} (id {})",
                    principal.username,
                    principal.id
                );
                HandshakeOutcome::Accepted(principal)
            }
            Err(err) => self.refuse(&err),
        }
    }

    fn refuse(&self, err: &BackendError) -> HandshakeOutcome {
        match self.policy {
            HandshakePolicy::Reject => {
                tracing::warn!("[Gatekeeper] Handshake rejected: {}", err);
                HandshakeOutcome::Rejected
            }
            HandshakePolicy::Anonymous => {
                tracing::debug!("[Gatekeeper] Anonymous handshake: {}", err);
                HandshakeOutcome::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::auth::principal::Role;
    use crate::shared::Command;

    fn gatekeeper(policy: HandshakePolicy) -> (Gatekeeper, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new(b"gatekeeper-secret", 3600));
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        (Gatekeeper::new(tokens.clone(), pool, policy), tokens)
    }

    fn connect(auth: Option<(&str, &str)>) -> Frame {
        let frame = Frame::new(Command::Connect).header("accept-version", "1.2");
        match auth {
            Some((name, value)) => frame.header(name, value),
            None => frame,
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Reject".parse::<HandshakePolicy>().unwrap(), HandshakePolicy::Reject);
        assert_eq!(" anonymous ".parse::<HandshakePolicy>().unwrap(), HandshakePolicy::Anonymous);
        assert!("open".parse::<HandshakePolicy>().is_err());
        assert_eq!(HandshakePolicy::default(), HandshakePolicy::Reject);
    }

    #[tokio::test]
    async fn test_valid_token_is_read_with_any_header_case() {
        let (gate, tokens) = gatekeeper(HandshakePolicy::Reject);
        let principal = Principal::new(9, "ana", [Role::Manager]);
        let token = tokens.issue(&principal).unwrap();

        for name in ["Authorization", "authorization", "AUTHORIZATION"] {
            let frame = connect(Some((name, &format!("Bearer {}", token))));
            assert_eq!(gate.verify_token(&frame).unwrap(), principal);
        }
    }

    #[tokio::test]
    async fn test_missing_or_bad_credential_under_each_policy() {
        let (reject, _) = gatekeeper(HandshakePolicy::Reject);
        let (anonymous, _) = gatekeeper(HandshakePolicy::Anonymous);

        let frames = [
            connect(None),
            connect(Some(("Authorization", "Basic Zm9vOmJhcg=="))),
            connect(Some(("Authorization", "Bearer not-a-token"))),
        ];
        for frame in &frames {
            assert_eq!(reject.verify_token(frame), Err(TokenError::Invalid));
            assert_eq!(reject.handshake(frame).await, HandshakeOutcome::Rejected);
            assert_eq!(anonymous.handshake(frame).await, HandshakeOutcome::Anonymous);
        }
    }
}
