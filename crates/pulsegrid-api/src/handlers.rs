//! REST API handlers.
//!
//! Each handler queries the `HealthMonitor` and returns JSON in the
//! wire shapes dashboards consume. Unknown sources get a 404 with a
//! descriptive message; internal failures get a generic 500 (the
//! cause is logged server-side, not leaked to clients).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::ApiState;

/// Error envelope for non-2xx responses.
#[derive(serde::Serialize)]
struct ApiError {
    success: bool,
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiError {
            success: false,
            error: msg.to_string(),
        }),
    )
}

/// GET /integrations
pub async fn list_integrations(State(state): State<ApiState>) -> impl IntoResponse {
    let integrations = state.monitor.all_health().await;
    Json(serde_json::json!({ "integrations": integrations }))
}

/// GET /integrations/{source}
pub async fn get_integration(
    State(state): State<ApiState>,
    Path(source): Path<String>,
) -> impl IntoResponse {
    match state.monitor.health(&source).await {
        Some(snapshot) => {
            Json(serde_json::json!({ "integration": snapshot })).into_response()
        }
        None => error_response(
            &format!("unknown source '{source}'"),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
    }
}

/// POST /integrations/{source}/sync
pub async fn sync_integration(
    State(state): State<ApiState>,
    Path(source): Path<String>,
) -> impl IntoResponse {
    if state.monitor.health(&source).await.is_none() {
        return error_response(
            &format!("unknown source '{source}'"),
            StatusCode::NOT_FOUND,
        )
        .into_response();
    }
    // Probe failures come back in the outcome, not as an HTTP error.
    let outcome = state.monitor.trigger_sync(&source).await;
    Json(outcome).into_response()
}

/// GET /statistics
pub async fn get_statistics(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.monitor.statistics().await)
}

/// GET /health — aggregate service health.
pub async fn aggregate_health(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.monitor.statistics().await;
    Json(serde_json::json!({
        "status": overall_status(stats.errors, stats.total),
        "total": stats.total,
        "errors": stats.errors,
    }))
}

/// Derive the overall status string from the error count: healthy
/// with no errors, unhealthy once half the sources (or more) err,
/// degraded in between.
fn overall_status(errors: u32, total: u32) -> &'static str {
    if errors == 0 {
        "healthy"
    } else if errors * 2 >= total {
        "unhealthy"
    } else {
        "degraded"
    }
}
