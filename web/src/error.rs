//! Error types for web handlers.
//!
//! [`AppError`] is the single error type returned by handlers. Domain
//! ([`RaffleError`]) and credential ([`AuthError`]) failures convert into it
//! with `?`, each variant landing on a fixed status code and machine-readable
//! `code`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use raffle_auth::AuthError;
use raffle_core::RaffleError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(
///     State(state): State<AppState>,
///     ApiPath(id): ApiPath<RewardId>,
/// ) -> Result<Json<Reward>, AppError> {
///     let reward = state.rewards.get(id).await?; // RaffleError -> AppError
///     Ok(Json(reward))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying cause, logged for server errors.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<RaffleError> for AppError {
    fn from(err: RaffleError) -> Self {
        let message = err.to_string();
        match err {
            RaffleError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND"),
            RaffleError::EmailTaken => Self::new(StatusCode::CONFLICT, message, "EMAIL_TAKEN"),
            RaffleError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, message, "INVALID_CREDENTIALS")
            }
            RaffleError::InactiveUser => {
                Self::new(StatusCode::UNAUTHORIZED, message, "INACTIVE_USER")
            }
            RaffleError::Forbidden(_) => Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN"),
            RaffleError::Validation(_) => Self::validation(message),
            RaffleError::QuantityBelowMinimum { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "QUANTITY_BELOW_MINIMUM")
            }
            RaffleError::QuantityTooLarge { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "QUANTITY_TOO_LARGE")
            }
            RaffleError::RewardCompleted => {
                Self::new(StatusCode::CONFLICT, message, "REWARD_COMPLETED")
            }
            RaffleError::AlreadyDrawn => Self::new(StatusCode::CONFLICT, message, "ALREADY_DRAWN"),
            RaffleError::NoNumbersSold => {
                Self::new(StatusCode::CONFLICT, message, "NO_NUMBERS_SOLD")
            }
            RaffleError::Conflict(_) => Self::conflict(message),
            RaffleError::Database(_) | RaffleError::Internal(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::unauthorized("Missing bearer token"),
            AuthError::InvalidToken => Self::unauthorized("Invalid token"),
            AuthError::TokenExpired => {
                Self::new(StatusCode::UNAUTHORIZED, "Token has expired", "TOKEN_EXPIRED")
            }
            AuthError::Hashing(_) | AuthError::Signing(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
