/**
 * Authentication Handler Types
 *
 * This module defines the request and response types used by the
 * authentication handlers.
 */

use serde::{Deserialize, Serialize};

use crate::backend::auth::principal::Principal;
use crate::backend::auth::users::User;

/// Sign up request
#[derive(Deserialize, Serialize, Debug)]
pub struct SignupRequest {
    /// User's chosen username (3-30 chars, alphanumeric + underscore)
    pub username: String,
    /// User's email address
    pub email: String,
    /// User's password (will be hashed before storage)
    pub password: String,
    /// Requested role names (`admin`, `manager`, anything else is member)
    #[serde(default)]
    pub role: Vec<String>,
}

/// Sign in request
///
/// `username` may also be the account's e-mail address.
#[derive(Deserialize, Serialize, Debug)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// E-mail verification request
#[derive(Deserialize, Serialize, Debug)]
pub struct VerifyEmailRequest {
    pub code: String,
}

/// Request naming an account by e-mail (resend verification, forgot password)
#[derive(Deserialize, Serialize, Debug)]
pub struct EmailRequest {
    pub email: String,
}

/// Password reset request
#[derive(Deserialize, Serialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Token response returned by sign in
#[derive(Serialize, Deserialize, Debug)]
pub struct JwtResponse {
    /// Bearer token
    pub token: String,
    /// Always `Bearer`
    #[serde(rename = "type")]
    pub token_type: String,
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Authority strings (`ROLE_*`)
    pub roles: Vec<String>,
}

impl JwtResponse {
    pub fn new(token: String, user: &User, principal: &Principal) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: principal.authorities(),
        }
    }
}

/// Plain message response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// User response (without sensitive data)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub enabled: bool,
    pub roles: Vec<String>,
}
