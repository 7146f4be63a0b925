//! pulsegrid-api — REST + SSE surface for PulseGrid.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/integrations` | Health snapshot for every source |
//! | GET | `/integrations/{source}` | One source's snapshot (404 if unknown) |
//! | POST | `/integrations/{source}/sync` | Trigger an out-of-band sync |
//! | GET | `/statistics` | Fleet-wide aggregates |
//! | GET | `/health` | Overall healthy/degraded/unhealthy status |
//! | GET | `/stream` | SSE: initial snapshot, then health-updates and alerts |

pub mod handlers;
pub mod stream;

use axum::routing::{get, post};
use axum::Router;

use pulsegrid_monitor::HealthMonitor;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub monitor: HealthMonitor,
}

/// Build the complete API router.
pub fn build_router(monitor: HealthMonitor) -> Router {
    let state = ApiState { monitor };

    Router::new()
        .route("/integrations", get(handlers::list_integrations))
        .route("/integrations/{source}", get(handlers::get_integration))
        .route("/integrations/{source}/sync", post(handlers::sync_integration))
        .route("/statistics", get(handlers::get_statistics))
        .route("/health", get(handlers::aggregate_health))
        .route("/stream", get(stream::stream_events))
        .with_state(state)
}
