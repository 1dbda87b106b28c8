//! Builders for test data.

use chrono::{DateTime, Duration, Utc};
use raffle_core::{Decimal, NewReward, RewardId, RewardTerms, Role, User, UserId};

/// Placeholder hash for users whose password is never checked.
pub const UNUSED_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$unused$unused";

/// An active regular user.
#[must_use]
pub fn user(name: &str, email: &str, now: DateTime<Utc>) -> User {
    User {
        id: UserId::new(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: UNUSED_PASSWORD_HASH.to_string(),
        role: Role::User,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

/// An active administrator.
#[must_use]
pub fn admin(name: &str, email: &str, now: DateTime<Utc>) -> User {
    User {
        role: Role::Admin,
        ..user(name, email, now)
    }
}

/// A free reward with a minimum quota of 1, drawn a week after `now`.
#[must_use]
pub fn new_reward(owner: UserId, name: &str, now: DateTime<Utc>) -> NewReward {
    NewReward {
        id: RewardId::new(),
        owner_id: owner,
        name: name.to_string(),
        description: format!("{name} raffle"),
        image: format!("https://img.example.com/{}.png", name.to_lowercase()),
        draw_date: now + Duration::days(7),
        images: Vec::new(),
        terms: RewardTerms::default(),
        created_at: now,
    }
}

/// A reward with explicit sale terms.
#[must_use]
pub fn priced_reward(
    owner: UserId,
    name: &str,
    price: Decimal,
    min_quota: i32,
    now: DateTime<Utc>,
) -> NewReward {
    NewReward {
        terms: RewardTerms { price, min_quota },
        ..new_reward(owner, name, now)
    }
}
