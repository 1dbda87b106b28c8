//! Shared HTTP handlers.

pub mod health;

pub use health::{HealthResponse, ReadinessResponse, health_check, readiness};
