//! Request authentication.

pub mod middleware;

pub use middleware::AuthUser;
