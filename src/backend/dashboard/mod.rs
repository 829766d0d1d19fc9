//! Dashboard Module
//!
//! Platform-wide statistics: user counts with role distribution, projects,
//! tasks, dependency edges and live realtime connections.
//!
//! - **`stats`** - Collection and the periodic `stats.dashboard` broadcast
//! - **`handlers`** - GET /api/dashboard/stats

pub mod handlers;
pub mod stats;

pub use stats::{collect_stats, DashboardStats};
