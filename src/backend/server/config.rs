/**
 * Server Configuration
 *
 * This module handles loading of server configuration from environment
 * variables (optionally populated from a `.env` file by the binary) and the
 * SQLite connection pool.
 *
 * # Variables
 *
 * | Variable | Default |
 * |---|---|
 * | `DATABASE_URL` | `sqlite://collabris.db` |
 * | `JWT_SECRET` | development secret (warned about) |
 * | `JWT_TTL_SECS` | 86400 |
 * | `SERVER_PORT` | 8080 |
 * | `HANDSHAKE_POLICY` | `reject` (`reject` or `anonymous`) |
 * | `BCRYPT_COST` | bcrypt's default cost |
 * | `STATS_INTERVAL_SECS` | 30 |
 * | `CODE_SWEEP_INTERVAL_SECS` | 3600 |
 * | `BROADCAST_CAPACITY` | 256 |
 * | `OUTBOUND_CAPACITY` | 64 |
 * | `SMTP_HOST` | unset (mail is only logged) |
 * | `SMTP_PORT` | 587 |
 * | `SMTP_USERNAME` / `SMTP_PASSWORD` | unset (no authentication) |
 * | `SMTP_FROM` | `Collabris <no-reply@collabris.local>` |
 * | `SMTP_TLS` | `true` (port 465 implicit TLS, other ports STARTTLS) |
 *
 * Unparseable values fall back to the default with a warning. Periodic
 * intervals are at least one second.
 */

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::backend::auth::sessions::DEFAULT_TOKEN_TTL_SECS;
use crate::backend::realtime::gatekeeper::HandshakePolicy;

const DEV_JWT_SECRET: &str = "collabris-development-secret-change-me";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_FROM: &str = "Collabris <no-reply@collabris.local>";
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// SMTP relay settings; present only when `SMTP_HOST` is set
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub use_tls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpConfig {
    /// Read the `SMTP_*` variables through `lookup`
    ///
    /// # Returns
    /// `None` when no host is configured
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let present = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = present("SMTP_HOST")?;
        let port = match present("SMTP_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid SMTP_PORT={:?}, using default {}", raw, DEFAULT_SMTP_PORT);
                DEFAULT_SMTP_PORT
            }),
            None => DEFAULT_SMTP_PORT,
        };
        let use_tls = match present("SMTP_TLS") {
            Some(raw) => !matches!(raw.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off"),
            None => true,
        };

        Some(Self {
            host,
            port,
            username: present("SMTP_USERNAME"),
            password: lookup("SMTP_PASSWORD").filter(|v| !v.is_empty()),
            from: present("SMTP_FROM").unwrap_or_else(|| DEFAULT_SMTP_FROM.to_string()),
            use_tls,
        })
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub port: u16,
    pub handshake_policy: HandshakePolicy,
    pub bcrypt_cost: u32,
    pub stats_interval: Duration,
    pub code_sweep_interval: Duration,
    pub broadcast_capacity: usize,
    pub outbound_capacity: usize,
    pub smtp: Option<SmtpConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://collabris.db".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            port: 8080,
            handshake_policy: HandshakePolicy::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            stats_interval: Duration::from_secs(30),
            code_sweep_interval: Duration::from_secs(60 * 60),
            broadcast_capacity: 256,
            outbound_capacity: 64,
            smtp: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set. Using the development secret.");
                defaults.jwt_secret.clone()
            }
        };

        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            jwt_secret,
            jwt_ttl_secs: env_or("JWT_TTL_SECS", defaults.jwt_ttl_secs),
            port: env_or("SERVER_PORT", defaults.port),
            handshake_policy: env_or("HANDSHAKE_POLICY", defaults.handshake_policy),
            bcrypt_cost: env_or("BCRYPT_COST", defaults.bcrypt_cost),
            stats_interval: interval_secs(env_or(
                "STATS_INTERVAL_SECS",
                defaults.stats_interval.as_secs(),
            )),
            code_sweep_interval: interval_secs(env_or(
                "CODE_SWEEP_INTERVAL_SECS",
                defaults.code_sweep_interval.as_secs(),
            )),
            broadcast_capacity: env_or("BROADCAST_CAPACITY", defaults.broadcast_capacity),
            outbound_capacity: env_or("OUTBOUND_CAPACITY", defaults.outbound_capacity),
            smtp: SmtpConfig::from_lookup(|name| std::env::var(name).ok()),
        }
    }
}

/// `tokio::time::interval` panics on a zero period
fn interval_secs(secs: u64) -> Duration {
    Duration::from_secs(secs).max(MIN_INTERVAL)
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using default {:?}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Open the SQLite pool and run embedded migrations
///
/// The database file is created if it does not exist and foreign keys are
/// enforced on every connection.
pub async fn load_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        sqlx::Error::from(e)
    })?;
    tracing::info!("Database migrations completed successfully");

    Ok(pool)
}
