//! Application state for the raffle HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - User and reward services
//! - Token issuer (for the auth extractor)
//! - Clock (token expiry is checked against it)
//! - Readiness probe (for `/ready`)

use crate::app::{RewardService, UserService};
use async_trait::async_trait;
use raffle_auth::{PasswordHasher, TokenIssuer};
use raffle_core::environment::Clock;
use raffle_core::{RewardRepository, UserRepository};
use raffle_postgres::PostgresStore;
use std::sync::Arc;

/// Dependency check behind the readiness endpoint.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Whether the database currently answers.
    async fn database_ready(&self) -> bool;
}

#[async_trait]
impl ReadinessProbe for PostgresStore {
    async fn database_ready(&self) -> bool {
        self.ping().await
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Registration, login, and user management
    pub users: Arc<UserService>,
    /// Rewards, number sales, and draws
    pub rewards: Arc<RewardService>,
    /// Verifies bearer tokens
    pub tokens: Arc<TokenIssuer>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Database probe for `/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
}

impl AppState {
    /// Wire the services over the given repositories.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        reward_repository: Arc<dyn RewardRepository>,
        tokens: TokenIssuer,
        clock: Arc<dyn Clock>,
        readiness: Arc<dyn ReadinessProbe>,
    ) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            users: Arc::new(UserService::new(
                user_repository,
                PasswordHasher::new(),
                Arc::clone(&tokens),
                Arc::clone(&clock),
            )),
            rewards: Arc::new(RewardService::new(reward_repository, Arc::clone(&clock))),
            tokens,
            clock,
            readiness,
        }
    }

    /// State backed by a `PostgreSQL` store.
    #[must_use]
    pub fn from_store(store: &PostgresStore, tokens: TokenIssuer, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(store.users()),
            Arc::new(store.rewards()),
            tokens,
            clock,
            Arc::new(store.clone()),
        )
    }
}
