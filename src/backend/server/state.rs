/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct serves as the central state container for the
 * application, holding:
 * - The SQLite connection pool
 * - The token service
 * - The broadcast router (which owns the subscriber registry)
 * - The dependency guard and its per-project locks
 * - The mailer
 * - Server configuration
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow Axum handlers to extract specific
 * parts of the state without needing the entire `AppState`. Domain services
 * (`ChatService`, `NotificationService`) are assembled on extraction from
 * the pool and router they wrap.
 *
 * # Example
 *
 * ```rust,no_run
 * use axum::extract::State;
 * use sqlx::SqlitePool;
 *
 * async fn handler(State(pool): State<SqlitePool>) {
 *     // Use the pool
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::auth::sessions::TokenService;
use crate::backend::chat::service::ChatService;
use crate::backend::mail::Mailer;
use crate::backend::notifications::service::NotificationService;
use crate::backend::realtime::registry::SubscriberRegistry;
use crate::backend::realtime::router::BroadcastRouter;
use crate::backend::server::config::ServerConfig;
use crate::backend::tasks::guard::DependencyGuard;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: SqlitePool,

    /// Bearer token issuer and validator
    pub tokens: Arc<TokenService>,

    /// Fan-out of broadcast events to live subscriptions
    pub router: BroadcastRouter,

    /// Cycle-checking writer of dependency edges
    pub guard: Arc<DependencyGuard>,

    /// Outgoing mail
    pub mailer: Arc<dyn Mailer>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Assemble the state from its external collaborators
    pub fn new(pool: SqlitePool, config: ServerConfig, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = Arc::new(TokenService::new(
            config.jwt_secret.as_bytes(),
            config.jwt_ttl_secs,
        ));
        let registry = Arc::new(SubscriberRegistry::new(config.broadcast_capacity));
        let router = BroadcastRouter::new(registry);
        let guard = Arc::new(DependencyGuard::new(pool.clone()));

        Self {
            pool,
            tokens,
            router,
            guard,
            mailer,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        self.router.registry()
    }

    pub fn chat_service(&self) -> ChatService {
        ChatService::new(self.pool.clone(), self.router.clone())
    }

    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(self.pool.clone(), self.router.clone())
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for BroadcastRouter {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.router.clone()
    }
}

impl FromRef<AppState> for Arc<DependencyGuard> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.guard.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Mailer> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ChatService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.chat_service()
    }
}

impl FromRef<AppState> for NotificationService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notification_service()
    }
}
