//! Error types for raffle operations.

use thiserror::Error;

/// Result type alias for raffle operations.
pub type Result<T> = std::result::Result<T, RaffleError>;

/// Error taxonomy shared by services and repositories.
///
/// Variants are grouped by category so the HTTP layer can map each one to a
/// status code without string matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RaffleError {
    // ═══════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════

    /// Requested entity does not exist.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of entity ("User", "Reward")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Accounts
    // ═══════════════════════════════════════════════════════════

    /// Email is already registered.
    #[error("Email is already in use")]
    EmailTaken,

    /// Email/password pair did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is deactivated.
    #[error("User is inactive")]
    InactiveUser,

    /// Caller may not act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ═══════════════════════════════════════════════════════════
    // Input
    // ═══════════════════════════════════════════════════════════

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Purchase below the reward's minimum quota.
    #[error("Quantity {requested} is below the minimum quota of {min}")]
    QuantityBelowMinimum {
        /// Minimum numbers per purchase
        min: i32,
        /// Requested quantity
        requested: i32,
    },

    /// Purchase above the per-purchase ceiling.
    #[error("Quantity {requested} exceeds the maximum of {max} numbers per purchase")]
    QuantityTooLarge {
        /// Maximum numbers per purchase
        max: i32,
        /// Requested quantity
        requested: i32,
    },

    // ═══════════════════════════════════════════════════════════
    // Raffle state
    // ═══════════════════════════════════════════════════════════

    /// Reward no longer sells numbers.
    #[error("Reward is completed; numbers can no longer be bought")]
    RewardCompleted,

    /// Reward already has a winner.
    #[error("Reward has already been drawn")]
    AlreadyDrawn,

    /// Draw attempted before any number was sold.
    #[error("No numbers have been bought for this reward")]
    NoNumbersSold,

    /// Write conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RaffleError {
    /// Shorthand for a missing user.
    pub fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "User",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing reward.
    pub fn reward_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "Reward",
            id: id.to_string(),
        }
    }

    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use raffle_core::RaffleError;
    /// assert!(RaffleError::Validation("name".into()).is_user_error());
    /// assert!(!RaffleError::Database("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::QuantityBelowMinimum { .. }
                | Self::QuantityTooLarge { .. }
                | Self::InvalidCredentials
        )
    }

    /// Returns `true` if the raffle's state forbids the operation.
    #[must_use]
    pub const fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::RewardCompleted
                | Self::AlreadyDrawn
                | Self::NoNumbersSold
                | Self::EmailTaken
                | Self::Conflict(_)
        )
    }
}
