//! User management endpoints (all require a bearer token).
//!
//! - GET /api/v1/users - List users
//! - GET /api/v1/users/:id - Get a user
//! - PUT /api/v1/users/:id - Update a user (self or admin)
//! - DELETE /api/v1/users/:id - Delete a user (self or admin)

use super::ListQuery;
use crate::auth::AuthUser;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use raffle_core::{Pagination, Role, UserChanges, UserId, UserProfile};
use raffle_web::{ApiJson, ApiPath, ApiQuery, AppError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// One page of users.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    /// Users on this page
    pub users: Vec<UserProfile>,
    /// Pagination metadata
    pub pagination: Pagination,
}

/// Partial user update. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// New display name
    pub name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New role (admin only)
    pub role: Option<Role>,
    /// New active flag (admin only)
    pub active: Option<bool>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            role: request.role,
            active: request.active,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List users, newest first.
///
/// # Errors
///
/// Returns 401 without a valid token.
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let page = state.users.list(query.page_request()).await?;

    Ok(Json(UserListResponse {
        users: page.items,
        pagination: page.pagination,
    }))
}

/// Get one user.
///
/// # Errors
///
/// Returns 404 if the user does not exist.
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.users.get(id).await?))
}

/// Update a user.
///
/// # Errors
///
/// - 403 when editing someone else, or changing role/active without admin rights
/// - 404 if the user does not exist
/// - 409 if the new email is taken
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.users.update(user.actor(), id, request.into()).await?;
    Ok(Json(profile))
}

/// Delete a user.
///
/// # Errors
///
/// - 403 when deleting someone else without admin rights
/// - 409 while the user owns rewards or holds numbers
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode, AppError> {
    state.users.delete(user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
