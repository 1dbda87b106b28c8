//! # Raffle Testing
//!
//! Test doubles for the raffle platform.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic timestamps
//! - In-memory [`UserRepository`](raffle_core::UserRepository) and
//!   [`RewardRepository`](raffle_core::RewardRepository) implementations that
//!   enforce the same allocation and draw rules as the `PostgreSQL` store
//! - Builders for users and rewards
//!
//! ## Example
//!
//! ```
//! use raffle_testing::{InMemoryStore, helpers, test_clock};
//! use raffle_core::{RewardRepository, UserRepository};
//! use raffle_core::environment::Clock;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let now = test_clock().now();
//!
//! let owner = store.users().create(&helpers::user("Owner", "owner@example.com", now)).await.unwrap();
//! let buyer = store.users().create(&helpers::user("Buyer", "buyer@example.com", now)).await.unwrap();
//! let reward = store.rewards().create(&helpers::new_reward(owner.id, "Bike", now)).await.unwrap();
//!
//! let numbers = store.rewards().buy_numbers(reward.id, buyer.id, 3, now).await.unwrap();
//! assert_eq!(numbers, vec![1, 2, 3]);
//! # });
//! ```

use chrono::{DateTime, Utc};
use raffle_core::environment::Clock;

pub mod helpers;
pub mod memory;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use raffle_testing::mocks::FixedClock;
    /// use raffle_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use memory::{InMemoryRewardRepository, InMemoryStore, InMemoryUserRepository};
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
