//! Authentication extractor for the raffle API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use raffle_server::auth::AuthUser;
//!
//! async fn my_rewards(
//!     State(state): State<AppState>,
//!     user: AuthUser,
//! ) -> Result<Json<RewardListResponse>, AppError> {
//!     // user.actor() is guaranteed to carry a valid, unexpired token
//!     let page = state.rewards.mine(user.actor(), PageRequest::default()).await?;
//!     ...
//! }
//! ```

use crate::app::Actor;
use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use raffle_auth::Claims;
use raffle_web::{AppError, BearerToken};

/// Authenticated caller.
///
/// Extracts the bearer token and verifies its signature, issuer, and expiry.
/// Use this as a handler parameter to require authentication.
///
/// # Errors
///
/// Rejects with 401 if the token is missing, malformed, or expired.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Verified claims
    pub claims: Claims,
}

impl AuthUser {
    /// The caller as seen by the services.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            id: self.claims.user_id(),
            role: self.claims.role,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let claims = state.tokens.verify(&token, state.clock.now())?;

        Ok(Self { claims })
    }
}
