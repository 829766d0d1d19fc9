/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Groups
 *
 * 1. `GET /ws` - WebSocket upgrade; authentication happens on the CONNECT frame
 * 2. Public API routes (sign up, sign in, verification, password reset)
 * 3. Protected API routes behind `auth_middleware`
 * 4. Fallback handler (404)
 */

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::middleware::auth_middleware;
use crate::backend::realtime::ws_handler;
use crate::backend::routes::api_routes::{configure_protected_routes, configure_public_routes};
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state shared by every handler
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    let protected = configure_protected_routes(Router::new()).route_layer(from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    let router = configure_public_routes(Router::new().route("/ws", get(ws_handler)))
        .merge(protected)
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(TraceLayer::new_for_http());

    router.with_state(app_state)
}
