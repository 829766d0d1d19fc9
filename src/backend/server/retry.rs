//! # Store Read Retries
//!
//! Idempotent reads are retried a bounded number of times when the store
//! reports a transient condition (pool timeout, I/O, SQLite busy/locked),
//! with a linear backoff between attempts. Writes are never retried here.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collabris::backend::server::retry::retry_read;
//! use collabris::backend::auth::users::get_user_by_id;
//!
//! # async fn example(pool: sqlx::SqlitePool) -> Result<(), sqlx::Error> {
//! let user = retry_read("load user", || get_user_by_id(&pool, 1)).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::backend::error::types::is_transient_store_error;

/// Attempts made before giving up
pub const READ_ATTEMPTS: u32 = 3;

/// Backoff unit; attempt `n` waits `n * READ_BACKOFF`
pub const READ_BACKOFF: Duration = Duration::from_millis(50);

/// Run an idempotent read, retrying transient store failures
pub async fn retry_read<T, F, Fut>(operation: &str, mut read: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 1;
    loop {
        match read().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < READ_ATTEMPTS && is_transient_store_error(&err) => {
                tracing::warn!(
                    "[Store] {} failed (attempt {}/{}): {}",
                    operation,
                    attempt,
                    READ_ATTEMPTS,
                    err
                );
                tokio::time::sleep(READ_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
