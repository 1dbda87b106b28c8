//! Router configuration for the raffle API.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{auth, purchases, rewards, users};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use raffle_web::correlation_id_layer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures:
/// - Health checks at the root (`/health`, `/ready`)
/// - The API under `/api/v1`
/// - Request tracing, correlation IDs, and CORS
///
/// # Arguments
///
/// - `state`: Application state to share with handlers
/// - `cors_origins`: Allowed origins; empty allows any origin
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Rewards
        .route(
            "/rewards",
            get(rewards::list_rewards).post(rewards::create_reward),
        )
        .route("/rewards/mine", get(rewards::list_my_rewards))
        .route(
            "/rewards/:id",
            get(rewards::get_reward)
                .put(rewards::update_reward)
                .delete(rewards::delete_reward),
        )
        .route("/rewards/:id/details", get(rewards::get_reward_details))
        .route("/rewards/:id/buyers", get(rewards::list_buyers))
        .route(
            "/rewards/:id/buyers/:user_id",
            post(rewards::buy_numbers).delete(rewards::remove_buyer),
        )
        .route(
            "/rewards/:id/buyers/:user_id/numbers",
            get(rewards::get_user_numbers),
        )
        .route("/rewards/:id/draw", post(rewards::draw))
        // Purchases
        .route(
            "/purchases/user/:user_id",
            get(purchases::list_user_purchases),
        );

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

/// Lowercase form of [`raffle_web::CORRELATION_ID_HEADER`].
const CORRELATION_HEADER: &str = "x-correlation-id";

/// CORS policy for browser clients.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CORRELATION_HEADER),
        ])
        .expose_headers([HeaderName::from_static(CORRELATION_HEADER)])
}

