//! Mapping of sqlx failures onto [`RaffleError`].

use raffle_core::RaffleError;

const USERS_EMAIL_KEY: &str = "users_email_key";
const REWARDS_DRAWN_IS_COMPLETED: &str = "rewards_drawn_is_completed";

/// Translate a sqlx error raised while doing `context`.
///
/// - unique violation on `users.email` → `EmailTaken`
/// - other unique or foreign key violations → `Conflict`
/// - reopening a drawn reward (`rewards_drawn_is_completed`) → `AlreadyDrawn`
/// - anything else → `Database`
pub(crate) fn map_db_error(context: &'static str) -> impl Fn(sqlx::Error) -> RaffleError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                if db_err.constraint() == Some(USERS_EMAIL_KEY) {
                    return RaffleError::EmailTaken;
                }
                return RaffleError::Conflict(format!("{context}: duplicate value"));
            }
            if db_err.is_check_violation() && db_err.constraint() == Some(REWARDS_DRAWN_IS_COMPLETED) {
                return RaffleError::AlreadyDrawn;
            }
            if db_err.is_foreign_key_violation() {
                return RaffleError::Conflict(format!("{context}: foreign key violation"));
            }
        }
        RaffleError::Database(format!("{context}: {err}"))
    }
}
