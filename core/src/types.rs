//! Domain types for the raffle platform.
//!
//! Users own rewards (raffles), buy sequential numbers against other users'
//! rewards, and a reward owner draws one winning number among those sold.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RaffleError;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reward (a raffle)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardId(Uuid);

impl RewardId {
    /// Creates a new random `RewardId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RewardId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RewardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RewardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Access role of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account
    #[default]
    User,
    /// Administrator; may act on any user or reward
    Admin,
}

impl Role {
    /// Convert role to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse role from its database string.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] if the string doesn't match a known role.
    pub fn parse(s: &str) -> Result<Self, RaffleError> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(RaffleError::Validation(format!("Invalid role: {s}"))),
        }
    }

    /// Whether this role may act on resources it does not own.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user account, including the password hash.
///
/// Never serialized; convert to [`UserProfile`] before it leaves the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Login email (unique)
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Access role
    pub role: Role,
    /// Inactive users cannot log in
    pub active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User as exposed over the API (no password hash).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Access role
    pub role: Role,
    /// Whether the account may log in
    pub active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    /// New display name
    pub name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New role
    pub role: Option<Role>,
    /// New active flag
    pub active: Option<bool>,
}

impl UserChanges {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none() && self.active.is_none()
    }
}

// ============================================================================
// Rewards
// ============================================================================

/// A reward being raffled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Reward ID
    pub id: RewardId,
    /// Owner (the user who runs the raffle)
    pub owner_id: UserId,
    /// Reward name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Cover image URL
    pub image: String,
    /// Announced draw date
    pub draw_date: DateTime<Utc>,
    /// Closed for sales (set by the owner or by the draw)
    pub completed: bool,
    /// Winning number, once drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_number: Option<i32>,
    /// When the draw happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawn_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    /// Whether a winner has been drawn.
    #[must_use]
    pub const fn is_drawn(&self) -> bool {
        self.winner_number.is_some()
    }
}

/// Sale terms of a reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTerms {
    /// Price per number
    pub price: Decimal,
    /// Minimum amount of numbers per purchase
    pub min_quota: i32,
}

impl Default for RewardTerms {
    fn default() -> Self {
        Self {
            price: Decimal::ZERO,
            min_quota: 1,
        }
    }
}

/// Input for creating a reward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReward {
    /// Reward ID (assigned by the service)
    pub id: RewardId,
    /// Owner
    pub owner_id: UserId,
    /// Reward name
    pub name: String,
    /// Description
    pub description: String,
    /// Cover image URL
    pub image: String,
    /// Announced draw date
    pub draw_date: DateTime<Utc>,
    /// Additional image URLs, in display order
    pub images: Vec<String>,
    /// Sale terms
    pub terms: RewardTerms,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewReward {
    /// The reward row this input produces.
    #[must_use]
    pub fn to_reward(&self) -> Reward {
        Reward {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            draw_date: self.draw_date,
            completed: false,
            winner_number: None,
            drawn_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial update of a reward. `None` leaves the field untouched.
///
/// `images`, when present, replaces the whole image list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardChanges {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New cover image
    pub image: Option<String>,
    /// New draw date
    pub draw_date: Option<DateTime<Utc>>,
    /// Open or close sales
    pub completed: Option<bool>,
    /// Replacement image list
    pub images: Option<Vec<String>>,
    /// New price per number
    pub price: Option<Decimal>,
    /// New minimum quota
    pub min_quota: Option<i32>,
}

impl RewardChanges {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.draw_date.is_none()
            && self.completed.is_none()
            && self.images.is_none()
            && self.price.is_none()
            && self.min_quota.is_none()
    }
}

/// A buyer of a reward with the amount of numbers they hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSummary {
    /// The buyer
    pub user: UserProfile,
    /// How many numbers they bought
    pub total_numbers: i64,
}

/// A sold number and who holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoldNumber {
    /// Ticket number
    pub number: i32,
    /// Holder
    pub user_id: UserId,
}

/// Everything shown on a reward page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardDetails {
    /// Base reward
    pub reward: Reward,
    /// Additional images
    pub images: Vec<String>,
    /// Sale terms
    pub terms: RewardTerms,
    /// Buyers, most numbers first
    pub buyers: Vec<BuyerSummary>,
    /// Winner, once drawn
    pub winner: Option<UserProfile>,
}

/// Status of a purchase from the buyer's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Reward still open
    Active,
    /// Reward closed or drawn
    Completed,
}

impl PurchaseStatus {
    /// Status derived from the reward's completion flag.
    #[must_use]
    pub const fn from_completed(completed: bool) -> Self {
        if completed { Self::Completed } else { Self::Active }
    }
}

/// All numbers a user holds in one reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Position within the returned page, starting at 1
    pub id: i64,
    /// Reward
    pub reward_id: RewardId,
    /// Reward name
    pub reward_name: String,
    /// Reward cover image
    pub reward_image: String,
    /// Numbers held, ascending
    pub numbers: Vec<i32>,
    /// First purchase time in this reward
    pub purchase_date: DateTime<Utc>,
    /// Price × amount of numbers
    pub total_amount: Decimal,
    /// Whether the reward is still open
    pub status: PurchaseStatus,
}

/// Result of a successful draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawOutcome {
    /// Drawn reward
    pub reward_id: RewardId,
    /// Winning number
    pub winner_number: i32,
    /// Holder of the winning number
    pub winner: UserProfile,
    /// Draw time
    pub drawn_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_database_strings() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()).ok(), Some(role));
        }
        assert!(Role::parse("superuser").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Admin).ok();
        assert_eq!(json.as_deref(), Some("\"admin\""));
    }

    #[test]
    fn ids_serialize_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&RewardId::from_uuid(uuid)).ok();
        assert_eq!(json, Some(format!("\"{uuid}\"")));
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(UserChanges::default().is_empty());
        assert!(RewardChanges::default().is_empty());
        let changes = RewardChanges {
            min_quota: Some(5),
            ..RewardChanges::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn purchase_status_follows_completion() {
        assert_eq!(PurchaseStatus::from_completed(false), PurchaseStatus::Active);
        assert_eq!(PurchaseStatus::from_completed(true), PurchaseStatus::Completed);
    }
}
