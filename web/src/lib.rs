//! Axum integration shared by the raffle HTTP services.
//!
//! This crate holds the pieces every handler needs regardless of the route:
//!
//! - [`AppError`]: JSON error responses, with conversions from
//!   [`RaffleError`](raffle_core::RaffleError) and
//!   [`AuthError`](raffle_auth::AuthError)
//! - [`extractors`]: correlation ID, client IP, user agent, bearer token,
//!   and JSON/path/query extractors that reject with [`AppError`]
//! - [`middleware`]: correlation ID propagation and request spans
//! - [`handlers`]: liveness and readiness endpoints
//!
//! # Request Flow
//!
//! ```text
//! request ─► correlation_id_layer ─► extractors ─► handler ─► service ─► repository
//!                                                     │
//!            response ◄── AppError::into_response ◄───┘ (on Err)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, ApiQuery, BearerToken, ClientIp, CorrelationId, UserAgent};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
