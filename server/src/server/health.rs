//! Health check endpoints.
//!
//! `/health` is the shared liveness handler from `raffle-web`; `/ready`
//! probes the database through the state's [`ReadinessProbe`](super::state::ReadinessProbe).

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use raffle_web::handlers::{ReadinessResponse, readiness};

pub use raffle_web::handlers::health_check;

/// Readiness check endpoint.
///
/// Returns 200 when the database answers and 503 otherwise, so load
/// balancers stop routing traffic while the database is down.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"database":true}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = state.readiness.database_ready().await;
    if !database {
        tracing::warn!("Readiness check failed: database unavailable");
    }
    readiness(database)
}
