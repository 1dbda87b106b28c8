//! Winner selection.
//!
//! The winner is a uniformly random index into the sold numbers, so each sold
//! number (not each buyer) has the same chance. Persisting the result exactly
//! once is the repository's job.

use crate::types::SoldNumber;
use rand::Rng;

/// Pick the winning number among `sold`.
///
/// Returns `None` when nothing has been sold.
///
/// # Examples
///
/// ```
/// use raffle_core::draw::pick_winner;
/// use raffle_core::types::{SoldNumber, UserId};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let holder = UserId::new();
/// let sold = [SoldNumber { number: 7, user_id: holder }];
/// let winner = pick_winner(&sold, &mut StdRng::seed_from_u64(1)).unwrap();
/// assert_eq!(winner.number, 7);
/// assert_eq!(winner.user_id, holder);
/// ```
pub fn pick_winner<R: Rng + ?Sized>(sold: &[SoldNumber], rng: &mut R) -> Option<SoldNumber> {
    if sold.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..sold.len());
    sold.get(index).copied()
}
