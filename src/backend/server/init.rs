/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including state creation, database loading, and route configuration.
 *
 * # Initialization Process
 *
 * The server initialization follows these steps:
 * 1. Open the SQLite pool and run migrations
 * 2. Build the token service, subscriber registry, router and guard
 * 3. Start background tasks (code sweep, stats broadcast, channel pruning)
 * 4. Create and configure the router
 */

use std::time::Duration;

use axum::Router;

use crate::backend::auth::codes::delete_expired_codes;
use crate::backend::dashboard::stats::spawn_stats_broadcaster;
use crate::backend::mail::mailer_for;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Interval between idle broadcast ring sweeps
const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Errors
///
/// Fails when the database cannot be opened or migrated.
pub async fn create_app(config: ServerConfig) -> Result<Router<()>, sqlx::Error> {
    tracing::info!("Initializing Collabris backend server");

    let state = build_state(config).await?;
    spawn_background_tasks(&state);

    let app = create_router(state);
    tracing::info!("Router configured with background tasks");
    Ok(app)
}

/// Open the database and assemble the application state
pub async fn build_state(config: ServerConfig) -> Result<AppState, sqlx::Error> {
    let pool = load_database(&config.database_url).await?;
    tracing::info!(
        "Handshake policy: {}, broadcast capacity: {}",
        config.handshake_policy,
        config.broadcast_capacity
    );
    let mailer = mailer_for(config.smtp.as_ref());
    Ok(AppState::new(pool, config, mailer))
}

/// Start the periodic maintenance tasks
///
/// - Expired verification codes are deleted every `code_sweep_interval`
/// - Dashboard stats are published every `stats_interval`
/// - Broadcast rings nobody listens to are dropped every five minutes
pub fn spawn_background_tasks(state: &AppState) {
    let pool = state.pool.clone();
    let sweep_interval = state.config.code_sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            match delete_expired_codes(&pool, chrono::Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Deleted {} expired verification codes", removed),
                Err(e) => tracing::warn!("Failed to delete expired verification codes: {}", e),
            }
        }
    });

    spawn_stats_broadcaster(
        state.pool.clone(),
        state.router.clone(),
        state.config.stats_interval,
    );

    let registry = state.registry().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            registry.prune_idle_channels();
        }
    });
}
