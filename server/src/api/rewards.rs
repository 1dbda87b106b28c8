//! Reward API endpoints.
//!
//! Public:
//! - GET /api/v1/rewards - List rewards (`?page&limit&search`)
//! - GET /api/v1/rewards/:id - Get a reward
//! - GET /api/v1/rewards/:id/details - Reward with images, terms, buyers, and winner
//! - GET /api/v1/rewards/:id/buyers - Buyers, most numbers first
//!
//! Authenticated:
//! - POST /api/v1/rewards - Create a reward
//! - GET /api/v1/rewards/mine - The caller's rewards
//! - PUT /api/v1/rewards/:id - Update (owner or admin)
//! - DELETE /api/v1/rewards/:id - Delete (owner or admin)
//! - POST /api/v1/rewards/:id/buyers/:user_id - Buy numbers
//! - DELETE /api/v1/rewards/:id/buyers/:user_id - Release a buyer's numbers (owner or admin)
//! - GET /api/v1/rewards/:id/buyers/:user_id/numbers - A buyer's numbers
//! - POST /api/v1/rewards/:id/draw - Draw the winner (owner or admin)

use super::ListQuery;
use crate::app::CreateReward;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use raffle_core::{
    BuyerSummary, Decimal, Pagination, Reward, RewardChanges, RewardDetails, RewardId, UserId,
    UserProfile,
};
use raffle_web::{ApiJson, ApiPath, ApiQuery, AppError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a reward.
#[derive(Debug, Deserialize)]
pub struct CreateRewardRequest {
    /// Reward name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Cover image URL
    #[serde(default)]
    pub image: String,
    /// Announced draw date
    pub draw_date: DateTime<Utc>,
    /// Additional image URLs, in display order
    #[serde(default)]
    pub images: Vec<String>,
    /// Price per number (default: 0)
    pub price: Option<Decimal>,
    /// Minimum numbers per purchase (default: 1)
    pub min_quota: Option<i32>,
}

impl From<CreateRewardRequest> for CreateReward {
    fn from(request: CreateRewardRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            image: request.image,
            draw_date: request.draw_date,
            images: request.images,
            price: request.price,
            min_quota: request.min_quota,
        }
    }
}

/// Partial reward update. Omitted fields are left unchanged;
/// `images`, when present, replaces the whole list.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRewardRequest {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New cover image
    pub image: Option<String>,
    /// New draw date
    pub draw_date: Option<DateTime<Utc>>,
    /// Close or reopen sales
    pub completed: Option<bool>,
    /// Replacement image list
    pub images: Option<Vec<String>>,
    /// New price per number
    pub price: Option<Decimal>,
    /// New minimum quota
    pub min_quota: Option<i32>,
}

impl From<UpdateRewardRequest> for RewardChanges {
    fn from(request: UpdateRewardRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            image: request.image,
            draw_date: request.draw_date,
            completed: request.completed,
            images: request.images,
            price: request.price,
            min_quota: request.min_quota,
        }
    }
}

/// One page of rewards.
#[derive(Debug, Serialize)]
pub struct RewardListResponse {
    /// Rewards on this page
    pub rewards: Vec<Reward>,
    /// Pagination metadata
    pub pagination: Pagination,
}

/// Everything shown on a reward page.
#[derive(Debug, Serialize)]
pub struct RewardDetailsResponse {
    /// Base reward fields
    #[serde(flatten)]
    pub reward: Reward,
    /// Additional images
    pub images: Vec<String>,
    /// Price per number
    pub price: Decimal,
    /// Minimum numbers per purchase
    pub min_quota: i32,
    /// Buyers, most numbers first
    pub buyers: Vec<BuyerSummary>,
    /// Winner, once drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_user: Option<UserProfile>,
}

impl From<RewardDetails> for RewardDetailsResponse {
    fn from(details: RewardDetails) -> Self {
        Self {
            reward: details.reward,
            images: details.images,
            price: details.terms.price,
            min_quota: details.terms.min_quota,
            buyers: details.buyers,
            winner_user: details.winner,
        }
    }
}

/// One page of buyers.
#[derive(Debug, Serialize)]
pub struct BuyerListResponse {
    /// Buyers on this page
    pub buyers: Vec<BuyerSummary>,
    /// Pagination metadata
    pub pagination: Pagination,
}

/// Request to buy numbers.
#[derive(Debug, Deserialize)]
pub struct BuyNumbersRequest {
    /// How many consecutive numbers to buy
    pub quantity: i32,
}

/// Response after buying numbers.
#[derive(Debug, Serialize)]
pub struct BuyNumbersResponse {
    /// Success message
    pub message: String,
    /// Numbers assigned, ascending and consecutive
    pub numbers: Vec<i32>,
    /// Amount bought
    pub quantity: i32,
}

/// Response after releasing a buyer's numbers.
#[derive(Debug, Serialize)]
pub struct RemoveBuyerResponse {
    /// Success message
    pub message: String,
    /// How many numbers were released
    pub removed: u64,
}

/// Numbers one user holds in one reward.
#[derive(Debug, Serialize)]
pub struct UserNumbersResponse {
    /// Reward
    pub reward_id: RewardId,
    /// Holder
    pub user_id: UserId,
    /// Numbers held, ascending
    pub numbers: Vec<i32>,
}

/// Response after a draw.
#[derive(Debug, Serialize)]
pub struct DrawResponse {
    /// Drawn reward
    pub reward_id: RewardId,
    /// Winning number
    pub winner_number: i32,
    /// Holder of the winning number
    pub winner_user: UserProfile,
    /// Draw time
    pub drawn_at: DateTime<Utc>,
    /// Success message
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List rewards, newest first.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/v1/rewards?page=1&limit=10&search=bike"
/// ```
///
/// # Errors
///
/// Returns 400 for non-numeric paging parameters.
pub async fn list_rewards(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<RewardListResponse>, AppError> {
    let page = state
        .rewards
        .list(query.page_request(), query.search.as_deref())
        .await?;

    Ok(Json(RewardListResponse {
        rewards: page.items,
        pagination: page.pagination,
    }))
}

/// Get a reward.
///
/// # Errors
///
/// Returns 404 if the reward does not exist.
pub async fn get_reward(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RewardId>,
) -> Result<Json<Reward>, AppError> {
    Ok(Json(state.rewards.get(id).await?))
}

/// Get a reward with images, terms, buyers, and winner.
///
/// # Errors
///
/// Returns 404 if the reward does not exist.
pub async fn get_reward_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RewardId>,
) -> Result<Json<RewardDetailsResponse>, AppError> {
    Ok(Json(state.rewards.details(id).await?.into()))
}

/// List a reward's buyers.
///
/// # Errors
///
/// Returns 404 if the reward does not exist.
pub async fn list_buyers(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RewardId>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<BuyerListResponse>, AppError> {
    let page = state.rewards.buyers(id, query.page_request()).await?;

    Ok(Json(BuyerListResponse {
        buyers: page.items,
        pagination: page.pagination,
    }))
}

/// Create a reward owned by the caller.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/rewards \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "Mountain Bike",
///     "description": "Brand new",
///     "draw_date": "2025-12-24T20:00:00Z",
///     "price": 2.5,
///     "min_quota": 2
///   }'
/// ```
///
/// # Errors
///
/// Returns 422 for a blank name, a negative price, or a minimum quota below 1.
pub async fn create_reward(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateRewardRequest>,
) -> Result<(StatusCode, Json<Reward>), AppError> {
    let reward = state.rewards.create(user.actor(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

/// List the caller's rewards.
///
/// # Errors
///
/// Returns 401 without a valid token.
pub async fn list_my_rewards(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<RewardListResponse>, AppError> {
    let page = state.rewards.mine(user.actor(), query.page_request()).await?;

    Ok(Json(RewardListResponse {
        rewards: page.items,
        pagination: page.pagination,
    }))
}

/// Update a reward.
///
/// # Errors
///
/// - 403 unless the caller owns the reward or is an admin
/// - 409 when reopening a drawn reward
/// - 422 for invalid fields
pub async fn update_reward(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RewardId>,
    ApiJson(request): ApiJson<UpdateRewardRequest>,
) -> Result<Json<Reward>, AppError> {
    let reward = state.rewards.update(user.actor(), id, request.into()).await?;
    Ok(Json(reward))
}

/// Delete a reward with everything attached to it.
///
/// # Errors
///
/// Returns 403 unless the caller owns the reward or is an admin.
pub async fn delete_reward(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RewardId>,
) -> Result<StatusCode, AppError> {
    state.rewards.delete(user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Buy consecutive numbers for `user_id`.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/rewards/<id>/buyers/<user_id> \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"quantity": 3}'
/// # {"message":"Numbers purchased successfully","numbers":[6,7,8],"quantity":3}
/// ```
///
/// # Errors
///
/// - 403 when buying for someone else without admin rights
/// - 404 for an unknown reward or user
/// - 409 once the reward is completed
/// - 422 below the minimum quota or above the per-purchase maximum
pub async fn buy_numbers(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((reward_id, user_id)): ApiPath<(RewardId, UserId)>,
    ApiJson(request): ApiJson<BuyNumbersRequest>,
) -> Result<Json<BuyNumbersResponse>, AppError> {
    let numbers = state
        .rewards
        .buy(user.actor(), reward_id, user_id, request.quantity)
        .await?;

    Ok(Json(BuyNumbersResponse {
        message: "Numbers purchased successfully".to_string(),
        numbers,
        quantity: request.quantity,
    }))
}

/// Release every number `user_id` holds in the reward.
///
/// # Errors
///
/// - 403 unless the caller owns the reward or is an admin
/// - 404 if the user holds no numbers
/// - 409 after the draw
pub async fn remove_buyer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((reward_id, user_id)): ApiPath<(RewardId, UserId)>,
) -> Result<Json<RemoveBuyerResponse>, AppError> {
    let removed = state
        .rewards
        .remove_buyer(user.actor(), reward_id, user_id)
        .await?;

    Ok(Json(RemoveBuyerResponse {
        message: "Buyer removed successfully".to_string(),
        removed,
    }))
}

/// Numbers `user_id` holds in the reward.
///
/// # Errors
///
/// Returns 404 if the reward does not exist.
pub async fn get_user_numbers(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath((reward_id, user_id)): ApiPath<(RewardId, UserId)>,
) -> Result<Json<UserNumbersResponse>, AppError> {
    let numbers = state.rewards.user_numbers(reward_id, user_id).await?;

    Ok(Json(UserNumbersResponse {
        reward_id,
        user_id,
        numbers,
    }))
}

/// Draw the winner among the sold numbers.
///
/// # Errors
///
/// - 403 unless the caller owns the reward or is an admin
/// - 409 if already drawn or nothing was sold
pub async fn draw(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<RewardId>,
) -> Result<Json<DrawResponse>, AppError> {
    let outcome = state.rewards.draw(user.actor(), id).await?;

    Ok(Json(DrawResponse {
        reward_id: outcome.reward_id,
        winner_number: outcome.winner_number,
        winner_user: outcome.winner,
        drawn_at: outcome.drawn_at,
        message: "Draw completed successfully".to_string(),
    }))
}
