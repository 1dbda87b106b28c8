//! Sequential number allocation.
//!
//! Each purchase receives the contiguous range directly above the highest
//! number sold so far. The caller must hold a lock on the reward for the
//! duration of read-max, allocate, insert; this module only does the math.
//!
//! ```text
//! sold: 1 2 3 4 5          request 3       sold: 1 2 3 4 5 [6 7 8]
//!               ▲                                           ▲   ▲
//!        highest_sold = 5                               first  last
//! ```

use crate::error::{RaffleError, Result};

/// Largest amount of numbers a single purchase may request.
pub const MAX_NUMBERS_PER_PURCHASE: i32 = 10_000;

/// An inclusive, non-empty range of ticket numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberRange {
    first: i32,
    last: i32,
}

impl NumberRange {
    /// First number of the range.
    #[must_use]
    pub const fn first(&self) -> i32 {
        self.first
    }

    /// Last number of the range (inclusive).
    #[must_use]
    pub const fn last(&self) -> i32 {
        self.last
    }

    /// How many numbers the range holds.
    #[must_use]
    pub const fn len(&self) -> i32 {
        self.last - self.first + 1
    }

    /// Always false; ranges hold at least one number.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Numbers of the range in ascending order.
    pub fn numbers(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }

    /// Collected [`numbers`](Self::numbers).
    #[must_use]
    pub fn to_vec(&self) -> Vec<i32> {
        self.numbers().collect()
    }
}

/// Compute the range a purchase of `quantity` numbers receives.
///
/// `highest_sold` is the current `MAX(number)` of the reward, `None` when
/// nothing has been sold. `min_quota` values below 1 are treated as 1.
///
/// # Errors
///
/// - [`RaffleError::Validation`] if `quantity < 1`
/// - [`RaffleError::QuantityBelowMinimum`] if `quantity < min_quota`
/// - [`RaffleError::QuantityTooLarge`] if `quantity > MAX_NUMBERS_PER_PURCHASE`
/// - [`RaffleError::Conflict`] if the range would overflow `i32`
///
/// # Examples
///
/// ```
/// use raffle_core::allocation::next_range;
///
/// let range = next_range(Some(5), 3, 1).unwrap();
/// assert_eq!(range.to_vec(), vec![6, 7, 8]);
///
/// let first = next_range(None, 2, 1).unwrap();
/// assert_eq!(first.to_vec(), vec![1, 2]);
/// ```
pub fn next_range(highest_sold: Option<i32>, quantity: i32, min_quota: i32) -> Result<NumberRange> {
    if quantity < 1 {
        return Err(RaffleError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }

    let min = min_quota.max(1);
    if quantity < min {
        return Err(RaffleError::QuantityBelowMinimum {
            min,
            requested: quantity,
        });
    }

    if quantity > MAX_NUMBERS_PER_PURCHASE {
        return Err(RaffleError::QuantityTooLarge {
            max: MAX_NUMBERS_PER_PURCHASE,
            requested: quantity,
        });
    }

    let first = highest_sold
        .unwrap_or(0)
        .max(0)
        .checked_add(1)
        .ok_or_else(|| RaffleError::Conflict("number space exhausted".to_string()))?;
    let last = first
        .checked_add(quantity - 1)
        .ok_or_else(|| RaffleError::Conflict("number space exhausted".to_string()))?;

    Ok(NumberRange { first, last })
}
