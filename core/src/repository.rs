//! Repository traits.
//!
//! These traits abstract over storage (`PostgreSQL` in production, in-memory
//! maps in tests). They are object safe so services can hold
//! `Arc<dyn UserRepository>` and `Arc<dyn RewardRepository>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pagination::{Page, PageRequest};
use crate::types::{
    BuyerSummary, DrawOutcome, NewReward, Purchase, Reward, RewardChanges, RewardDetails,
    RewardId, User, UserChanges, UserId,
};

/// User storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// - Email already registered → `RaffleError::EmailTaken`
    /// - Database failure → `RaffleError::Database`
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID.
    ///
    /// # Errors
    ///
    /// - User not found → `RaffleError::NotFound`
    async fn get_by_id(&self, id: UserId) -> Result<User>;

    /// Get user by email.
    ///
    /// # Errors
    ///
    /// - User not found → `RaffleError::NotFound`
    async fn get_by_email(&self, email: &str) -> Result<User>;

    /// Check whether an email is registered.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn list(&self, page: PageRequest) -> Result<Page<User>>;

    /// Apply a partial update and return the updated user.
    ///
    /// # Errors
    ///
    /// - User not found → `RaffleError::NotFound`
    /// - New email already registered → `RaffleError::EmailTaken`
    async fn update(&self, id: UserId, changes: &UserChanges, now: DateTime<Utc>) -> Result<User>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// - User not found → `RaffleError::NotFound`
    /// - User still owns rewards or numbers → `RaffleError::Conflict`
    async fn delete(&self, id: UserId) -> Result<()>;
}

/// Reward, number sale, and draw storage.
#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// Insert a reward with its terms and images, atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails.
    async fn create(&self, reward: &NewReward) -> Result<Reward>;

    /// Get a reward by ID.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn get(&self, id: RewardId) -> Result<Reward>;

    /// Get a reward with images, terms, buyers, and winner.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn get_details(&self, id: RewardId) -> Result<RewardDetails>;

    /// List rewards, newest first, optionally filtered by a search term
    /// matched against name and description.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<Reward>>;

    /// List rewards owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Reward>>;

    /// Apply a partial update (reward row, terms, images) atomically.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn update(&self, id: RewardId, changes: &RewardChanges, now: DateTime<Utc>) -> Result<Reward>;

    /// Delete a reward with its numbers, images, and terms.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn delete(&self, id: RewardId) -> Result<()>;

    /// Sell the next `quantity` sequential numbers of a reward to `buyer`.
    ///
    /// Implementations must make read-highest, allocate, and insert atomic
    /// with respect to other purchases and the draw of the same reward.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    /// - Reward completed → `RaffleError::RewardCompleted`
    /// - Quantity rules → `RaffleError::QuantityBelowMinimum` / `QuantityTooLarge` / `Validation`
    async fn buy_numbers(
        &self,
        reward: RewardId,
        buyer: UserId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>>;

    /// Remove every number `buyer` holds in a reward. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    /// - Reward already drawn → `RaffleError::AlreadyDrawn`
    async fn remove_buyer(&self, reward: RewardId, buyer: UserId) -> Result<u64>;

    /// Buyers of a reward with their number counts, most numbers first.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn buyers(&self, reward: RewardId, page: PageRequest) -> Result<Page<BuyerSummary>>;

    /// Numbers `buyer` holds in a reward, ascending.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    async fn user_numbers(&self, reward: RewardId, buyer: UserId) -> Result<Vec<i32>>;

    /// Purchase history of a user, one entry per reward, latest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn user_purchases(&self, buyer: UserId, page: PageRequest) -> Result<Page<Purchase>>;

    /// Draw the winner of a reward among its sold numbers, exactly once,
    /// and mark the reward completed.
    ///
    /// # Errors
    ///
    /// - Reward not found → `RaffleError::NotFound`
    /// - Already drawn → `RaffleError::AlreadyDrawn`
    /// - Nothing sold → `RaffleError::NoNumbersSold`
    async fn draw(&self, reward: RewardId, now: DateTime<Utc>) -> Result<DrawOutcome>;
}
