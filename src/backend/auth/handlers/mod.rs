//! Authentication Handlers Module
//!
//! This module contains all HTTP handlers for authentication endpoints.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs           - Module exports and documentation
//! ├── types.rs         - Request and response types
//! ├── signup.rs        - User registration
//! ├── login.rs         - Sign in
//! ├── verification.rs  - E-mail verification and resend
//! ├── password.rs      - Forgot / reset password
//! └── me.rs            - Current user
//! ```
//!
//! # Handlers
//!
//! - **`signup`** - POST /api/auth/signup
//! - **`signin`** - POST /api/auth/signin
//! - **`verify_email`** - POST /api/auth/verify-email
//! - **`resend_verification`** - POST /api/auth/resend-verification
//! - **`forgot_password`** - POST /api/auth/forgot-password
//! - **`reset_password`** - POST /api/auth/reset-password
//! - **`get_me`** - GET /api/auth/me (authenticated)
//!
//! # Account Lifecycle
//!
//! 1. **Signup**: account created disabled, verification code mailed
//! 2. **Verify**: code consumed, account enabled
//! 3. **Signin**: credentials checked, bearer token returned
//! 4. **Reset**: reset code mailed, consumed together with the new password

/// Request and response types
pub mod types;

/// Signup handler
pub mod signup;

/// Sign in handler
pub mod login;

/// E-mail verification handlers
pub mod verification;

/// Password reset handlers
pub mod password;

/// Get current user handler
pub mod me;

pub use types::{
    EmailRequest, JwtResponse, MessageResponse, ResetPasswordRequest, SigninRequest,
    SignupRequest, UserResponse, VerifyEmailRequest,
};

pub use login::signin;
pub use me::get_me;
pub use password::{forgot_password, reset_password};
pub use signup::signup;
pub use verification::{resend_verification, verify_email};
