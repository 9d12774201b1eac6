//! Liveness probe.
//!
//! `GET /ping` performs a single collection listing against the database
//! handle. No retries, no timeouts beyond the driver's own.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::DbHealth;
use crate::state::AppState;

impl IntoResponse for DbHealth {
    fn into_response(self) -> Response {
        match self {
            DbHealth::Connected => {
                (StatusCode::OK, Json(json!({ "status": "OK", "db": "connected" })))
                    .into_response()
            }
            DbHealth::NotConnected => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "ERROR", "db": "not connected" })),
            )
                .into_response(),
            DbHealth::QueryFailed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "ERROR", "message": message })),
            )
                .into_response(),
        }
    }
}

/// Liveness handler reporting database connectivity.
pub async fn ping(State(state): State<AppState>) -> DbHealth {
    let health = DbHealth::check(state.db.as_ref()).await;
    if health != DbHealth::Connected {
        tracing::warn!(?health, "Liveness check failed");
    }
    health
}
