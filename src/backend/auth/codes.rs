/**
 * Verification Codes
 *
 * Short single-use codes mailed to users for e-mail verification and
 * password reset.
 *
 * - 6 characters over `A-Z0-9`, drawn from the OS random source
 * - valid for 10 minutes
 * - issuing a code removes the owner's earlier unused codes of the same kind
 * - consumption is one conditional UPDATE, so a code is spent at most once
 *   even under concurrent requests
 */

use rand::{rngs::OsRng, Rng};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::shared::UserId;

/// Number of characters in a code
pub const CODE_LENGTH: usize = 6;

/// Characters a code is drawn from
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Lifetime of a code: 10 minutes
pub const CODE_TTL_SECS: i64 = 10 * 60;

/// Purpose of a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    EmailVerification,
    PasswordReset,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::EmailVerification => "EMAIL_VERIFICATION",
            CodeKind::PasswordReset => "PASSWORD_RESET",
        }
    }
}

/// Stored verification code
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i64,
    pub user_id: UserId,
    pub code: String,
    pub kind: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub used_at: Option<i64>,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Code errors
#[derive(Debug, Error)]
pub enum CodeError {
    /// Unknown, expired or already-used code
    #[error("invalid or expired code")]
    ExpiredOrInvalid,

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Generate a random code
pub fn generate_code() -> String {
    let mut rng = OsRng;
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Issue a fresh code for a user
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `user_id` - Owner of the code
/// * `kind` - Purpose of the code
///
/// # Returns
/// The stored code
pub async fn issue_code(
    pool: &SqlitePool,
    user_id: UserId,
    kind: CodeKind,
) -> Result<VerificationCode, CodeError> {
    issue_code_at(pool, user_id, kind, chrono::Utc::now().timestamp()).await
}

/// Issue a fresh code as if the current time were `now`
pub async fn issue_code_at(
    pool: &SqlitePool,
    user_id: UserId,
    kind: CodeKind,
    now: i64,
) -> Result<VerificationCode, CodeError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM verification_codes
        WHERE user_id = ? AND kind = ? AND used_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .execute(&mut *tx)
    .await?;

    let code = sqlx::query_as::<_, VerificationCode>(
        r#"
        INSERT INTO verification_codes (user_id, code, kind, created_at, expires_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, code, kind, created_at, expires_at, used_at
        "#,
    )
    .bind(user_id)
    .bind(generate_code())
    .bind(kind.as_str())
    .bind(now)
    .bind(now + CODE_TTL_SECS)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("[Auth] Issued {} code for user {}", kind.as_str(), user_id);
    Ok(code)
}

/// Consume a code by value, returning its owner
pub async fn consume_code(
    pool: &SqlitePool,
    code: &str,
    kind: CodeKind,
) -> Result<UserId, CodeError> {
    consume_code_at(pool, code, kind, chrono::Utc::now().timestamp()).await
}

/// Consume a code by value as if the current time were `now`
pub async fn consume_code_at(
    pool: &SqlitePool,
    code: &str,
    kind: CodeKind,
    now: i64,
) -> Result<UserId, CodeError> {
    let owner: Option<UserId> = sqlx::query_scalar(
        r#"
        UPDATE verification_codes
        SET used_at = ?
        WHERE id = (
            SELECT id FROM verification_codes
            WHERE code = ? AND kind = ? AND used_at IS NULL AND expires_at > ?
            ORDER BY id DESC
            LIMIT 1
        )
        AND used_at IS NULL
        RETURNING user_id
        "#,
    )
    .bind(now)
    .bind(code)
    .bind(kind.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await?;

    owner.ok_or(CodeError::ExpiredOrInvalid)
}

/// Consume a code that must belong to `user_id`
pub async fn consume_code_for_user(
    pool: &SqlitePool,
    user_id: UserId,
    code: &str,
    kind: CodeKind,
) -> Result<(), CodeError> {
    consume_code_for_user_at(pool, user_id, code, kind, chrono::Utc::now().timestamp()).await
}

/// Consume a user's code as if the current time were `now`
pub async fn consume_code_for_user_at(
    pool: &SqlitePool,
    user_id: UserId,
    code: &str,
    kind: CodeKind,
    now: i64,
) -> Result<(), CodeError> {
    let result = sqlx::query(
        r#"
        UPDATE verification_codes
        SET used_at = ?
        WHERE user_id = ? AND code = ? AND kind = ?
          AND used_at IS NULL AND expires_at > ?
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(code)
    .bind(kind.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CodeError::ExpiredOrInvalid);
    }
    Ok(())
}

/// Latest code of a kind for a user, used or not
pub async fn latest_code(
    pool: &SqlitePool,
    user_id: UserId,
    kind: CodeKind,
) -> Result<Option<VerificationCode>, sqlx::Error> {
    sqlx::query_as::<_, VerificationCode>(
        r#"
        SELECT id, user_id, code, kind, created_at, expires_at, used_at
        FROM verification_codes
        WHERE user_id = ? AND kind = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}

/// Delete codes that expired at or before `now`
///
/// # Returns
/// Number of deleted codes
pub async fn delete_expired_codes(pool: &SqlitePool, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM verification_codes WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_code_expiry_boundary() {
        let code = VerificationCode {
            id: 1,
            user_id: 1,
            code: "ABC123".to_string(),
            kind: CodeKind::PasswordReset.as_str().to_string(),
            created_at: 100,
            expires_at: 100 + CODE_TTL_SECS,
            used_at: None,
        };
        assert!(!code.is_expired_at(100 + CODE_TTL_SECS - 1));
        assert!(code.is_expired_at(100 + CODE_TTL_SECS));
        assert!(!code.is_used());
    }
}
