/**
 * User Model and Database Operations
 *
 * This module handles user records, their roles and password hashing.
 * Users are created disabled and enabled once their e-mail is verified.
 */

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::backend::auth::principal::{Principal, Role};
use crate::shared::UserId;

/// User struct representing a user in the database
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: UserId,
    /// Username (unique, 3-30 chars, alphanumeric + underscore)
    pub username: String,
    /// User email address (unique)
    pub email: String,
    /// Hashed password (bcrypt)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Set once the e-mail address is verified
    pub enabled: bool,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, enabled, created_at, updated_at";

/// Create a new, disabled user with its roles
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `username` - User's chosen username
/// * `email` - User email
/// * `password_hash` - Hashed password
/// * `roles` - Resolved role set; an empty set stores `ROLE_MEMBER`
///
/// # Returns
/// Created user or error
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
    roles: &BTreeSet<Role>,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password_hash, enabled, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let default_roles = BTreeSet::from([Role::default()]);
    let roles = if roles.is_empty() { &default_roles } else { roles };
    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(user.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(user)
}

/// Get user by ID
pub async fn get_user_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Get user by username
pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Get user by email
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Look a user up by username, falling back to e-mail
pub async fn get_user_by_login(pool: &SqlitePool, login: &str) -> Result<Option<User>, sqlx::Error> {
    match get_user_by_username(pool, login).await? {
        Some(user) => Ok(Some(user)),
        None => get_user_by_email(pool, login).await,
    }
}

/// Roles of a user, sorted
pub async fn get_roles(pool: &SqlitePool, user_id: UserId) -> Result<Vec<Role>, sqlx::Error> {
    let authorities: Vec<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let mut roles: Vec<Role> = authorities
        .iter()
        .filter_map(|authority| Role::from_authority(authority))
        .collect();
    roles.sort();
    Ok(roles)
}

/// Build the principal for a stored user
pub async fn load_principal(pool: &SqlitePool, user: &User) -> Result<Principal, sqlx::Error> {
    let roles = get_roles(pool, user.id).await?;
    Ok(Principal::new(user.id, user.username.clone(), roles))
}

/// Enable or disable a user
pub async fn set_enabled(pool: &SqlitePool, user_id: UserId, enabled: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET enabled = ?, updated_at = ? WHERE id = ?")
        .bind(enabled)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace a user's password hash
pub async fn update_password(
    pool: &SqlitePool,
    user_id: UserId,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Total number of users
pub async fn count_users(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

/// Number of users holding each role
pub async fn count_users_by_role(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT role, COUNT(*) FROM user_roles GROUP BY role ORDER BY role",
    )
    .fetch_all(pool)
    .await
}

/// Hash a password with the given bcrypt cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, password_hash)
}

/// Validate username format
///
/// Usernames must be:
/// - 3-30 characters long
/// - Contain only alphanumeric characters and underscores
/// - Start with a letter
pub fn is_valid_username(username: &str) -> bool {
    if username.len() < 3 || username.len() > 30 {
        return false;
    }

    let mut chars = username.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob_99"));
        assert!(!is_valid_username("al"));
        assert!(!is_valid_username("9lives"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"a".repeat(31)));
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("password123", 4).unwrap();
        assert!(verify_password("password123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
