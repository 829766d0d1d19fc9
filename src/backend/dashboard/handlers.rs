/**
 * Dashboard Handler
 *
 * GET /api/dashboard/stats, for Admins and Managers.
 */

use axum::{extract::State, response::Json};

use crate::backend::dashboard::stats::{collect_stats, DashboardStats};
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;

/// Current dashboard statistics
///
/// # Errors
///
/// * `403 Forbidden` - Caller is neither Admin nor Manager
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<DashboardStats>, BackendError> {
    if !principal.can_view_dashboard() {
        return Err(BackendError::forbidden(
            "Dashboard requires the admin or manager role",
        ));
    }

    let stats = collect_stats(&state.pool, state.registry()).await?;
    Ok(Json(stats))
}
