//! Application services - the use cases behind the HTTP handlers.
//!
//! Services coordinate between validation, authorization, and storage:
//! 1. Normalize and validate the input
//! 2. Check that the caller may act on the target
//! 3. Call the repository (which enforces allocation and draw rules)
//! 4. Record metrics and log the outcome

use crate::metrics;
use raffle_auth::{AuthError, DUMMY_PASSWORD_HASH, IssuedToken, PasswordHasher, TokenIssuer};
use raffle_core::environment::Clock;
use raffle_core::validation;
use raffle_core::{
    BuyerSummary, Decimal, DrawOutcome, NewReward, Page, PageRequest, Purchase, RaffleError,
    Reward, RewardChanges, RewardDetails, RewardId, RewardRepository, RewardTerms, Role, User,
    UserChanges, UserId, UserProfile, UserRepository,
};
use chrono::{DateTime, Utc};
use raffle_web::AppError;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in application services
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Domain or storage failure
    #[error(transparent)]
    Raffle(#[from] RaffleError),

    /// Hashing or token failure
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Raffle(e) => e.into(),
            ServiceError::Auth(e) => e.into(),
        }
    }
}

/// Result type for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

fn forbidden(reason: &str) -> ServiceError {
    RaffleError::Forbidden(reason.to_string()).into()
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Caller's user ID
    pub id: UserId,
    /// Caller's role, as carried by the token
    pub role: Role,
}

impl Actor {
    /// Whether the caller may act on behalf of `user`.
    #[must_use]
    pub fn may_act_for(&self, user: UserId) -> bool {
        self.role.is_admin() || self.id == user
    }
}

// ============================================================================
// Users
// ============================================================================

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed bearer token
    pub token: IssuedToken,
    /// The logged-in user
    pub user: UserProfile,
}

/// Lowercased, trimmed email.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account registration, login, and user management.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a new user service
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            clock,
        }
    }

    /// Create a regular, active account.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Validation`] for a blank name, malformed email, or short password
    /// - [`RaffleError::EmailTaken`] if the email is registered
    pub async fn register(&self, registration: Registration) -> ServiceResult<UserProfile> {
        let name = validation::required("name", &registration.name)?;
        let email = normalize_email(&registration.email);
        validation::validate_email(&email)?;
        validation::validate_password(&registration.password)?;

        if self.users.email_exists(&email).await? {
            return Err(RaffleError::EmailTaken.into());
        }

        let password_hash = self.hasher.hash_async(registration.password).await?;
        let now = self.clock.now();
        let user = self
            .users
            .create(&User {
                id: UserId::new(),
                name,
                email,
                password_hash,
                role: Role::User,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        metrics::record_user_registered();
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.profile())
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    /// An unknown email is still checked against [`DUMMY_PASSWORD_HASH`] so
    /// both paths pay for one Argon2 verification.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::InvalidCredentials`] for an unknown email or wrong password
    /// - [`RaffleError::InactiveUser`] if the account is disabled
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let email = normalize_email(email);
        let user = match self.users.get_by_email(&email).await {
            Ok(user) => user,
            Err(RaffleError::NotFound { .. }) => {
                self.hasher
                    .verify_async(password.to_string(), DUMMY_PASSWORD_HASH.to_string())
                    .await?;
                tracing::warn!("Login attempt for unknown email");
                return Err(RaffleError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };

        let matches = self
            .hasher
            .verify_async(password.to_string(), user.password_hash.clone())
            .await?;
        if !matches {
            tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(RaffleError::InvalidCredentials.into());
        }
        if !user.active {
            return Err(RaffleError::InactiveUser.into());
        }

        let profile = user.profile();
        let token = self.tokens.issue(&profile, self.clock.now())?;
        tracing::info!(user_id = %profile.id, "User logged in");
        Ok(LoginOutcome {
            token,
            user: profile,
        })
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no such user exists.
    pub async fn get(&self, id: UserId) -> ServiceResult<UserProfile> {
        Ok(self.users.get_by_id(id).await?.profile())
    }

    /// One page of users, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list(&self, page: PageRequest) -> ServiceResult<Page<UserProfile>> {
        Ok(self.users.list(page).await?.map(|user| user.profile()))
    }

    /// Apply a partial update.
    ///
    /// Users may edit themselves; only administrators may edit others or
    /// change `role` and `active`.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Forbidden`] when the caller lacks the rights above
    /// - [`RaffleError::Validation`] for a blank name or malformed email
    /// - [`RaffleError::EmailTaken`] if the new email belongs to someone else
    pub async fn update(
        &self,
        actor: Actor,
        id: UserId,
        mut changes: UserChanges,
    ) -> ServiceResult<UserProfile> {
        if !actor.may_act_for(id) {
            return Err(forbidden("you can only modify your own account"));
        }
        if (changes.role.is_some() || changes.active.is_some()) && !actor.role.is_admin() {
            return Err(forbidden("only administrators can change role or active status"));
        }

        if let Some(name) = &changes.name {
            changes.name = Some(validation::required("name", name)?);
        }
        if let Some(email) = &changes.email {
            let email = normalize_email(email);
            validation::validate_email(&email)?;
            changes.email = Some(email);
        }

        if changes.is_empty() {
            return self.get(id).await;
        }

        let user = self.users.update(id, &changes, self.clock.now()).await?;
        tracing::info!(user_id = %id, actor = %actor.id, "User updated");
        Ok(user.profile())
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Forbidden`] if the caller is neither the user nor an admin
    /// - [`RaffleError::NotFound`] if no such user exists
    /// - [`RaffleError::Conflict`] if the user still owns rewards or holds numbers
    pub async fn delete(&self, actor: Actor, id: UserId) -> ServiceResult<()> {
        if !actor.may_act_for(id) {
            return Err(forbidden("you can only delete your own account"));
        }
        self.users.delete(id).await?;
        tracing::info!(user_id = %id, actor = %actor.id, "User deleted");
        Ok(())
    }
}

// ============================================================================
// Rewards
// ============================================================================

/// Input for creating a reward.
#[derive(Debug, Clone)]
pub struct CreateReward {
    /// Reward name
    pub name: String,
    /// Description
    pub description: String,
    /// Cover image URL
    pub image: String,
    /// Announced draw date
    pub draw_date: DateTime<Utc>,
    /// Additional image URLs
    pub images: Vec<String>,
    /// Price per number (default 0)
    pub price: Option<Decimal>,
    /// Minimum numbers per purchase (default 1)
    pub min_quota: Option<i32>,
}

/// Reward management, number sales, and draws.
pub struct RewardService {
    rewards: Arc<dyn RewardRepository>,
    clock: Arc<dyn Clock>,
}

impl RewardService {
    /// Create a new reward service
    #[must_use]
    pub fn new(rewards: Arc<dyn RewardRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { rewards, clock }
    }

    /// Create a reward owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] for a blank name, a negative price,
    /// or a minimum quota below 1.
    pub async fn create(&self, actor: Actor, input: CreateReward) -> ServiceResult<Reward> {
        let name = validation::required("name", &input.name)?;
        validation::validate_terms(input.price, input.min_quota)?;

        let defaults = RewardTerms::default();
        let reward = self
            .rewards
            .create(&NewReward {
                id: RewardId::new(),
                owner_id: actor.id,
                name,
                description: input.description.trim().to_string(),
                image: input.image.trim().to_string(),
                draw_date: input.draw_date,
                images: validation::clean_images(input.images),
                terms: RewardTerms {
                    price: input.price.unwrap_or(defaults.price),
                    min_quota: input.min_quota.unwrap_or(defaults.min_quota),
                },
                created_at: self.clock.now(),
            })
            .await?;

        metrics::record_reward_created();
        tracing::info!(reward_id = %reward.id, owner_id = %actor.id, "Reward created");
        Ok(reward)
    }

    /// Look up a reward.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no such reward exists.
    pub async fn get(&self, id: RewardId) -> ServiceResult<Reward> {
        Ok(self.rewards.get(id).await?)
    }

    /// Reward with images, terms, buyers, and winner.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no such reward exists.
    pub async fn details(&self, id: RewardId) -> ServiceResult<RewardDetails> {
        Ok(self.rewards.get_details(id).await?)
    }

    /// One page of rewards, optionally filtered by a search term.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn list(&self, page: PageRequest, search: Option<&str>) -> ServiceResult<Page<Reward>> {
        let search = search.map(str::trim).filter(|term| !term.is_empty());
        Ok(self.rewards.list(page, search).await?)
    }

    /// One page of the caller's rewards.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn mine(&self, actor: Actor, page: PageRequest) -> ServiceResult<Page<Reward>> {
        Ok(self.rewards.list_by_owner(actor.id, page).await?)
    }

    /// Apply a partial update as the owner or an admin.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] / [`RaffleError::Forbidden`] unless the caller owns the reward or is an admin
    /// - [`RaffleError::Validation`] for invalid fields
    /// - [`RaffleError::AlreadyDrawn`] when reopening a drawn reward
    pub async fn update(
        &self,
        actor: Actor,
        id: RewardId,
        mut changes: RewardChanges,
    ) -> ServiceResult<Reward> {
        let reward = self.manageable(actor, id).await?;

        if let Some(name) = &changes.name {
            changes.name = Some(validation::required("name", name)?);
        }
        validation::validate_terms(changes.price, changes.min_quota)?;
        changes.images = changes.images.map(validation::clean_images);
        if reward.is_drawn() && changes.completed == Some(false) {
            return Err(RaffleError::AlreadyDrawn.into());
        }

        if changes.is_empty() {
            return Ok(reward);
        }

        let reward = self.rewards.update(id, &changes, self.clock.now()).await?;
        tracing::info!(reward_id = %id, actor = %actor.id, "Reward updated");
        Ok(reward)
    }

    /// Delete a reward with its details, images, and sold numbers.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if no such reward exists
    /// - [`RaffleError::Forbidden`] unless the caller owns the reward or is an admin
    pub async fn delete(&self, actor: Actor, id: RewardId) -> ServiceResult<()> {
        self.manageable(actor, id).await?;
        self.rewards.delete(id).await?;
        tracing::info!(reward_id = %id, actor = %actor.id, "Reward deleted");
        Ok(())
    }

    /// Sell `quantity` consecutive numbers to `buyer`.
    ///
    /// Callers buy for themselves; admins may buy for anyone.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Forbidden`] when buying for someone else
    /// - [`RaffleError::NotFound`] for an unknown reward or buyer
    /// - [`RaffleError::RewardCompleted`] once sales are closed
    /// - [`RaffleError::QuantityBelowMinimum`] / [`RaffleError::QuantityTooLarge`]
    pub async fn buy(
        &self,
        actor: Actor,
        reward: RewardId,
        buyer: UserId,
        quantity: i32,
    ) -> ServiceResult<Vec<i32>> {
        if !actor.may_act_for(buyer) {
            return Err(forbidden("you can only buy numbers for yourself"));
        }

        let numbers = self
            .rewards
            .buy_numbers(reward, buyer, quantity, self.clock.now())
            .await?;

        metrics::record_numbers_sold(numbers.len());
        tracing::info!(
            reward_id = %reward,
            user_id = %buyer,
            quantity,
            first = numbers.first().copied(),
            last = numbers.last().copied(),
            "Numbers sold"
        );
        Ok(numbers)
    }

    /// Release every number `buyer` holds in a reward.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] / [`RaffleError::Forbidden`] unless the caller owns the reward or is an admin
    /// - [`RaffleError::NotFound`] if the user holds no numbers
    /// - [`RaffleError::AlreadyDrawn`] after the draw
    pub async fn remove_buyer(
        &self,
        actor: Actor,
        reward: RewardId,
        buyer: UserId,
    ) -> ServiceResult<u64> {
        self.manageable(actor, reward).await?;

        let removed = self.rewards.remove_buyer(reward, buyer).await?;
        if removed == 0 {
            return Err(RaffleError::NotFound {
                resource: "Buyer",
                id: buyer.to_string(),
            }
            .into());
        }

        tracing::info!(reward_id = %reward, user_id = %buyer, removed, "Buyer removed");
        Ok(removed)
    }

    /// One page of buyers, most numbers first.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no such reward exists.
    pub async fn buyers(&self, reward: RewardId, page: PageRequest) -> ServiceResult<Page<BuyerSummary>> {
        Ok(self.rewards.buyers(reward, page).await?)
    }

    /// Numbers `buyer` holds in a reward, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no such reward exists.
    pub async fn user_numbers(&self, reward: RewardId, buyer: UserId) -> ServiceResult<Vec<i32>> {
        Ok(self.rewards.user_numbers(reward, buyer).await?)
    }

    /// Purchase history of `buyer`, as the buyer or an admin.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Forbidden`] for anyone else.
    pub async fn purchases(
        &self,
        actor: Actor,
        buyer: UserId,
        page: PageRequest,
    ) -> ServiceResult<Page<Purchase>> {
        if !actor.may_act_for(buyer) {
            return Err(forbidden("you can only view your own purchases"));
        }
        Ok(self.rewards.user_purchases(buyer, page).await?)
    }

    /// Draw the winner, as the owner or an admin.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] / [`RaffleError::Forbidden`] unless the caller owns the reward or is an admin
    /// - [`RaffleError::AlreadyDrawn`] on every draw after the first
    /// - [`RaffleError::NoNumbersSold`] if nobody bought a number
    pub async fn draw(&self, actor: Actor, reward: RewardId) -> ServiceResult<DrawOutcome> {
        self.manageable(actor, reward).await?;

        let outcome = self.rewards.draw(reward, self.clock.now()).await?;

        metrics::record_draw();
        tracing::info!(
            reward_id = %reward,
            winner_number = outcome.winner_number,
            winner_id = %outcome.winner.id,
            "Reward drawn"
        );
        Ok(outcome)
    }

    /// Load a reward the caller owns (or any reward, for admins).
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if no such reward exists
    /// - [`RaffleError::Forbidden`] if the caller is neither owner nor admin
    async fn manageable(&self, actor: Actor, id: RewardId) -> ServiceResult<Reward> {
        let reward = self.rewards.get(id).await?;
        if !actor.may_act_for(reward.owner_id) {
            return Err(forbidden("only the reward owner can do this"));
        }
        Ok(reward)
    }
}
