//! # Raffle Core
//!
//! Domain types and rules for the raffle platform.
//!
//! Users create **rewards** (raffles) with a price per number and a minimum
//! quota per purchase. Other users buy sequential number ranges, and the
//! owner draws one winning number among those sold, exactly once.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, users, rewards, purchases
//! - [`allocation`]: next sequential range above the highest sold number
//! - [`draw`]: uniform winner pick among sold numbers
//! - [`repository`]: storage traits implemented by `raffle-postgres`
//! - [`pagination`], [`validation`]: shared request handling
//! - [`environment`]: injected dependencies (clock)
//!
//! ## Example
//!
//! ```
//! use raffle_core::allocation::next_range;
//!
//! // Five numbers sold so far; the next buyer asks for three.
//! let range = next_range(Some(5), 3, 1).unwrap();
//! assert_eq!(range.to_vec(), vec![6, 7, 8]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod allocation;
pub mod draw;
pub mod error;
pub mod pagination;
pub mod repository;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use error::{RaffleError, Result};
pub use pagination::{Page, PageRequest, Pagination};
pub use repository::{RewardRepository, UserRepository};
pub use rust_decimal::Decimal;
pub use types::{
    BuyerSummary, DrawOutcome, NewReward, Purchase, PurchaseStatus, Reward, RewardChanges,
    RewardDetails, RewardId, RewardTerms, Role, SoldNumber, User, UserChanges, UserId,
    UserProfile,
};

/// Environment traits for dependency injection.
///
/// All time reads go through [`Clock`](environment::Clock) so tests can pin
/// timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use raffle_core::environment::{Clock, SystemClock};
    ///
    /// let before = chrono::Utc::now();
    /// assert!(SystemClock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
