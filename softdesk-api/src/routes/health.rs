/// Health check endpoint
///
/// Verifies the server is running and the store answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "storage": "postgres",
///   "database": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Store backend name
    pub storage: String,

    /// Store connectivity
    pub database: String,
}

/// Health check handler
///
/// Returns 200 when the store answers, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    let health = if status == StatusCode::OK { "healthy" } else { "degraded" };

    let body = HealthResponse {
        status: health.to_string(),
        version: softdesk_shared::VERSION.to_string(),
        storage: state.store.backend().to_string(),
        database: database.to_string(),
    };

    (status, Json(body))
}
