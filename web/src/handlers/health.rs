//! Health check endpoints.
//!
//! Liveness never touches dependencies; readiness reports whether the
//! database answered, and the application decides how to probe it.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Liveness response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness endpoint.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Build the readiness response for a database probe result.
///
/// 200 when the database answered, 503 otherwise.
#[must_use]
pub fn readiness(database: bool) -> (StatusCode, Json<ReadinessResponse>) {
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}
