//! Business metrics for the raffle platform.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `raffle_users_registered_total` - Accounts created
//! - `raffle_rewards_created_total` - Rewards created
//! - `raffle_numbers_sold_total` - Numbers sold across all rewards
//! - `raffle_purchases_total` - Successful purchase requests
//! - `raffle_draws_total` - Completed draws

use metrics::{counter, describe_counter};

/// Register all business metric descriptions.
///
/// Call once at startup, after the Prometheus recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "raffle_users_registered_total",
        "Total number of user accounts registered"
    );
    describe_counter!(
        "raffle_rewards_created_total",
        "Total number of rewards created"
    );
    describe_counter!(
        "raffle_numbers_sold_total",
        "Total number of raffle numbers sold"
    );
    describe_counter!(
        "raffle_purchases_total",
        "Total number of successful number purchases"
    );
    describe_counter!("raffle_draws_total", "Total number of completed draws");

    tracing::info!("Business metrics registered");
}

/// Record a registration.
pub fn record_user_registered() {
    counter!("raffle_users_registered_total").increment(1);
}

/// Record a new reward.
pub fn record_reward_created() {
    counter!("raffle_rewards_created_total").increment(1);
}

/// Record a purchase of `quantity` numbers.
pub fn record_numbers_sold(quantity: usize) {
    counter!("raffle_purchases_total").increment(1);
    counter!("raffle_numbers_sold_total").increment(quantity as u64);
}

/// Record a completed draw.
pub fn record_draw() {
    counter!("raffle_draws_total").increment(1);
}
