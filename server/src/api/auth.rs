//! Authentication endpoints.
//!
//! - POST /api/v1/auth/register - Create an account
//! - POST /api/v1/auth/login - Exchange credentials for a bearer token

use crate::app::Registration;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use raffle_core::UserProfile;
use raffle_web::{ApiJson, AppError, ClientIp, UserAgent};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to register a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Login email (stored lowercased)
    pub email: String,
    /// Password, at least 6 characters
    pub password: String,
}

/// Request to log in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Password
    pub password: String,
}

/// Response after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// The logged-in user
    pub user: UserProfile,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new account.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ana", "email": "ana@example.com", "password": "secret1"}'
/// ```
///
/// # Errors
///
/// - 409 if the email is taken
/// - 422 for a blank name, malformed email, or short password
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = state
        .users
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Log in and receive a bearer token.
///
/// The client address and user agent are logged with every attempt.
///
/// # Errors
///
/// Returns 401 for wrong credentials or an inactive account.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = match state.users.login(&request.email, &request.password).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(client_ip = %ip, user_agent = %user_agent, "Login failed");
            return Err(e.into());
        }
    };
    tracing::info!(
        user_id = %outcome.user.id,
        client_ip = %ip,
        user_agent = %user_agent,
        "Login succeeded"
    );

    Ok(Json(LoginResponse {
        token: outcome.token.token,
        expires_at: outcome.token.expires_at,
        user: outcome.user,
    }))
}
