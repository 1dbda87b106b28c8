//! `PostgreSQL` storage for the raffle platform.
//!
//! Implements [`UserRepository`](raffle_core::UserRepository) and
//! [`RewardRepository`](raffle_core::RewardRepository) on top of a sqlx
//! connection pool. Queries are checked at runtime (`sqlx::query_as` with
//! `FromRow` rows), so building the crate does not need a live database.
//!
//! Number sales and draws run inside transactions that lock the reward row
//! with `SELECT ... FOR UPDATE`, so concurrent buyers of the same reward are
//! serialized and always receive disjoint, consecutive ranges.
//!
//! # Example
//!
//! ```no_run
//! use raffle_postgres::{DatabaseSettings, PostgresStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect(&DatabaseSettings::new("postgres://localhost/raffle")).await?;
//! store.migrate().await?;
//! let rewards = store.rewards();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod rewards;
pub mod users;

use raffle_core::{RaffleError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub use rewards::PostgresRewardRepository;
pub use users::PostgresUserRepository;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// How long to wait for a connection
    pub acquire_timeout: Duration,
    /// Connections idle longer than this are closed
    pub idle_timeout: Duration,
}

impl DatabaseSettings {
    /// Settings for `url` with default pool sizes.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Handle to the raffle database.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Database`] if the database is unreachable.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .connect(&settings.url)
            .await
            .map_err(|e| RaffleError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::from_pool(pool))
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RaffleError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Whether the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Database ping failed");
                false
            }
        }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// User repository backed by this pool.
    #[must_use]
    pub fn users(&self) -> PostgresUserRepository {
        PostgresUserRepository::new(self.pool.clone())
    }

    /// Reward repository backed by this pool.
    #[must_use]
    pub fn rewards(&self) -> PostgresRewardRepository {
        PostgresRewardRepository::new(self.pool.clone())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
