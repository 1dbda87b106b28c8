//! Purchase history.
//!
//! - GET /api/v1/purchases/user/:user_id - A user's purchases, one entry per reward

use super::ListQuery;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use raffle_core::{Pagination, Purchase, UserId};
use raffle_web::{ApiPath, ApiQuery, AppError};
use serde::Serialize;

/// One page of purchases, most recent reward first.
#[derive(Debug, Serialize)]
pub struct PurchaseListResponse {
    /// Purchases on this page
    pub purchases: Vec<Purchase>,
    /// Pagination metadata
    pub pagination: Pagination,
}

/// List the numbers a user bought, grouped by reward.
///
/// # Errors
///
/// Returns 403 unless the caller is that user or an admin.
pub async fn list_user_purchases(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<PurchaseListResponse>, AppError> {
    let page = state
        .rewards
        .purchases(user.actor(), user_id, query.page_request())
        .await?;

    Ok(Json(PurchaseListResponse {
        purchases: page.items,
        pagination: page.pagination,
    }))
}
