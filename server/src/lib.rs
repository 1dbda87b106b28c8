//! # Raffle Server
//!
//! HTTP API for running raffles:
//!
//! - users register and log in with a bearer token
//! - authenticated users create **rewards** with a price per number and a
//!   minimum quota per purchase
//! - buyers purchase **consecutive number ranges**; concurrent purchases of the
//!   same reward never overlap
//! - the owner draws one winner among the sold numbers, exactly once
//!
//! # Architecture
//!
//! ```text
//! axum router ─► api handlers ─► app services ─► repositories (raffle-core traits)
//!      │              │               │                 │
//!  correlation     AuthUser        validation,     PostgreSQL (raffle-postgres)
//!  id + tracing    extractor       ownership,      or in-memory (raffle-testing)
//!                                  metrics
//! ```
//!
//! # Modules
//!
//! - [`config`]: environment configuration
//! - [`app`]: user and reward services
//! - [`auth`]: bearer token extractor
//! - [`api`]: request/response types and handlers
//! - [`server`]: state, router, and health checks
//! - [`metrics`]: business counters

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod server;

pub use config::Config;
pub use server::{AppState, build_router};
