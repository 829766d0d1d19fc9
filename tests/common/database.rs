//! Database test fixtures and utilities
//!
//! Every test gets its own in-memory SQLite database with the migrations
//! applied. The pool holds a single connection, so the database lives as
//! long as the pool.

use std::str::FromStr;
use std::sync::Arc;

use collabris::backend::mail::Mailer;
use collabris::backend::realtime::HandshakePolicy;
use collabris::backend::server::{config::ServerConfig, AppState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::mail::MemoryMailer;

/// Secret used for every test token
pub const TEST_JWT_SECRET: &str = "collabris-test-secret";

/// Create a migrated in-memory database
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test database pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Configuration with cheap password hashing and a fixed secret
pub fn test_config(policy: HandshakePolicy) -> ServerConfig {
    ServerConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        handshake_policy: policy,
        bcrypt_cost: 4,
        ..ServerConfig::default()
    }
}

/// Test application fixture
pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(HandshakePolicy::Reject).await
    }

    pub async fn with_policy(policy: HandshakePolicy) -> Self {
        let pool = test_pool().await;
        let mailer = Arc::new(MemoryMailer::default());
        let state = AppState::new(pool, test_config(policy), mailer.clone() as Arc<dyn Mailer>);
        Self { state, mailer }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }
}
