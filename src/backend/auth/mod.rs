//! Authentication Module
//!
//! This module handles principals, bearer tokens, verification codes, user
//! records and the authentication HTTP surface.
//!
//! # Architecture
//!
//! - **`principal`** - `Principal` and the closed `Role` set
//! - **`sessions`** - `TokenService`: HS256 bearer token issue/validate
//! - **`codes`** - Single-use e-mail verification and password reset codes
//! - **`users`** - User model and database operations
//! - **`handlers`** - HTTP handlers for authentication endpoints
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── principal.rs    - Principal and roles
//! ├── sessions.rs     - Bearer tokens
//! ├── codes.rs        - Verification codes
//! ├── users.rs        - User model and database operations
//! └── handlers/       - HTTP handlers
//! ```
//!
//! # Security
//!
//! - Passwords are hashed using bcrypt before storage
//! - Tokens are stateless and expire after `JWT_TTL_SECS` (24h by default)
//! - Every token failure is reported as the same authentication failure
//! - Verification codes are spent with a single compare-and-set update

/// Principals and roles
pub mod principal;

/// Bearer token generation and validation
pub mod sessions;

/// Verification codes
pub mod codes;

/// User data model and database operations
pub mod users;

/// HTTP handlers for authentication endpoints
pub mod handlers;

// Re-export commonly used types
pub use principal::{Principal, Role};
pub use sessions::{TokenError, TokenService};
