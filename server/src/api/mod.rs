//! HTTP API endpoints, mounted under `/api/v1`.
//!
//! - [`auth`]: register and login
//! - [`users`]: user management
//! - [`rewards`]: rewards, buyers, number sales, and draws
//! - [`purchases`]: purchase history

pub mod auth;
pub mod purchases;
pub mod rewards;
pub mod users;

use raffle_core::PageRequest;
use serde::Deserialize;

/// Query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 10, max: 100)
    pub limit: Option<i64>,
    /// Case-insensitive search over name and description (rewards only)
    pub search: Option<String>,
}

impl ListQuery {
    /// Normalized page request.
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
