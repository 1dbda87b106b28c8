//! In-memory repositories.
//!
//! Both repositories share one [`InMemoryStore`] so that rewards can resolve
//! buyer profiles and user deletion can see references, like foreign keys
//! would. Every operation runs under a single mutex, which gives purchases
//! and draws the same atomicity the `PostgreSQL` row lock provides.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use raffle_core::allocation::next_range;
use raffle_core::draw::pick_winner;
use raffle_core::{
    BuyerSummary, Decimal, DrawOutcome, NewReward, Page, PageRequest, Purchase, PurchaseStatus,
    RaffleError, Result, Reward, RewardChanges, RewardDetails, RewardId, RewardRepository,
    RewardTerms, SoldNumber, User, UserChanges, UserId, UserProfile, UserRepository,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredReward {
    reward: Reward,
    images: Vec<String>,
    terms: RewardTerms,
}

#[derive(Debug, Clone, Copy)]
struct SoldRow {
    reward_id: RewardId,
    number: i32,
    user_id: UserId,
    purchased_at: DateTime<Utc>,
}

#[derive(Debug)]
struct State {
    users: HashMap<UserId, User>,
    rewards: HashMap<RewardId, StoredReward>,
    numbers: Vec<SoldRow>,
    rng: StdRng,
}

impl State {
    fn profile(&self, id: UserId) -> Result<UserProfile> {
        self.users
            .get(&id)
            .map(User::profile)
            .ok_or_else(|| RaffleError::user_not_found(id))
    }

    fn reward(&self, id: RewardId) -> Result<&StoredReward> {
        self.rewards
            .get(&id)
            .ok_or_else(|| RaffleError::reward_not_found(id))
    }

    fn reward_mut(&mut self, id: RewardId) -> Result<&mut StoredReward> {
        self.rewards
            .get_mut(&id)
            .ok_or_else(|| RaffleError::reward_not_found(id))
    }

    fn sold(&self, reward: RewardId) -> impl Iterator<Item = &SoldRow> {
        self.numbers.iter().filter(move |row| row.reward_id == reward)
    }

    /// Buyers with counts, most numbers first, ties by first number held.
    fn buyer_summaries(&self, reward: RewardId) -> Result<Vec<BuyerSummary>> {
        let mut counts: HashMap<UserId, (i64, i32)> = HashMap::new();
        for row in self.sold(reward) {
            let entry = counts.entry(row.user_id).or_insert((0, row.number));
            entry.0 += 1;
            entry.1 = entry.1.min(row.number);
        }

        let mut ranked: Vec<(UserId, i64, i32)> = counts
            .into_iter()
            .map(|(user, (count, first))| (user, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .map(|(user, total_numbers, _)| {
                Ok(BuyerSummary {
                    user: self.profile(user)?,
                    total_numbers,
                })
            })
            .collect()
    }

    fn holder_of(&self, reward: RewardId, number: i32) -> Option<UserId> {
        self.sold(reward)
            .find(|row| row.number == number)
            .map(|row| row.user_id)
    }
}

/// Shared in-memory storage backing both repositories.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Empty store with an entropy-seeded draw RNG.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Empty store whose draws are reproducible for `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                users: HashMap::new(),
                rewards: HashMap::new(),
                numbers: Vec::new(),
                rng,
            })),
        }
    }

    /// User repository view of this store.
    #[must_use]
    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: self.clone(),
        }
    }

    /// Reward repository view of this store.
    #[must_use]
    pub fn rewards(&self) -> InMemoryRewardRepository {
        InMemoryRewardRepository {
            store: self.clone(),
        }
    }

    /// Every number sold for `reward`, in sale order.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Internal`] if the lock is poisoned.
    pub fn sold_numbers(&self, reward: RewardId) -> Result<Vec<SoldNumber>> {
        Ok(self
            .lock()?
            .sold(reward)
            .map(|row| SoldNumber {
                number: row.number,
                user_id: row.user_id,
            })
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RaffleError::Internal("in-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let items = items.into_iter().skip(offset).take(limit).collect();
    Page::new(items, page, total)
}

fn newest_first(rewards: &mut [Reward]) {
    rewards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

// ============================================================================
// Users
// ============================================================================

/// In-memory [`UserRepository`].
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

impl InMemoryUserRepository {
    /// Repository over a fresh store.
    #[must_use]
    pub fn new() -> Self {
        InMemoryStore::new().users()
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let mut state = self.store.lock()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RaffleError::EmailTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_by_id(&self, id: UserId) -> Result<User> {
        self.store
            .lock()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RaffleError::user_not_found(id))
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.store
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| RaffleError::NotFound {
                resource: "User",
                id: email.to_string(),
            })
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.store.lock()?.users.values().any(|u| u.email == email))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>> {
        let mut users: Vec<User> = self.store.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(users, page))
    }

    async fn update(&self, id: UserId, changes: &UserChanges, now: DateTime<Utc>) -> Result<User> {
        let mut state = self.store.lock()?;
        if let Some(email) = &changes.email {
            if state.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RaffleError::EmailTaken);
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RaffleError::user_not_found(id))?;
        if let Some(name) = &changes.name {
            user.name.clone_from(name);
        }
        if let Some(email) = &changes.email {
            user.email.clone_from(email);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let mut state = self.store.lock()?;
        if !state.users.contains_key(&id) {
            return Err(RaffleError::user_not_found(id));
        }
        let owns_rewards = state.rewards.values().any(|r| r.reward.owner_id == id);
        let holds_numbers = state.numbers.iter().any(|row| row.user_id == id);
        if owns_rewards || holds_numbers {
            return Err(RaffleError::Conflict(
                "user still owns rewards or holds numbers".to_string(),
            ));
        }
        state.users.remove(&id);
        Ok(())
    }
}

// ============================================================================
// Rewards
// ============================================================================

/// In-memory [`RewardRepository`].
#[derive(Debug, Clone)]
pub struct InMemoryRewardRepository {
    store: InMemoryStore,
}

#[async_trait]
impl RewardRepository for InMemoryRewardRepository {
    async fn create(&self, new: &NewReward) -> Result<Reward> {
        let mut state = self.store.lock()?;
        if !state.users.contains_key(&new.owner_id) {
            return Err(RaffleError::user_not_found(new.owner_id));
        }
        let reward = new.to_reward();
        state.rewards.insert(
            reward.id,
            StoredReward {
                reward: reward.clone(),
                images: new.images.clone(),
                terms: new.terms,
            },
        );
        Ok(reward)
    }

    async fn get(&self, id: RewardId) -> Result<Reward> {
        Ok(self.store.lock()?.reward(id)?.reward.clone())
    }

    async fn get_details(&self, id: RewardId) -> Result<RewardDetails> {
        let state = self.store.lock()?;
        let stored = state.reward(id)?;
        let winner = stored
            .reward
            .winner_number
            .and_then(|number| state.holder_of(id, number))
            .map(|holder| state.profile(holder))
            .transpose()?;

        Ok(RewardDetails {
            reward: stored.reward.clone(),
            images: stored.images.clone(),
            terms: stored.terms,
            buyers: state.buyer_summaries(id)?,
            winner,
        })
    }

    async fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<Reward>> {
        let needle = search.map(str::to_lowercase);
        let mut rewards: Vec<Reward> = self
            .store
            .lock()?
            .rewards
            .values()
            .map(|stored| &stored.reward)
            .filter(|reward| {
                needle.as_deref().is_none_or(|needle| {
                    reward.name.to_lowercase().contains(needle)
                        || reward.description.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect();
        newest_first(&mut rewards);
        Ok(paginate(rewards, page))
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Reward>> {
        let mut rewards: Vec<Reward> = self
            .store
            .lock()?
            .rewards
            .values()
            .filter(|stored| stored.reward.owner_id == owner)
            .map(|stored| stored.reward.clone())
            .collect();
        newest_first(&mut rewards);
        Ok(paginate(rewards, page))
    }

    async fn update(&self, id: RewardId, changes: &RewardChanges, now: DateTime<Utc>) -> Result<Reward> {
        let mut state = self.store.lock()?;
        let stored = state.reward_mut(id)?;
        let reward = &mut stored.reward;
        if reward.is_drawn() && changes.completed == Some(false) {
            return Err(RaffleError::AlreadyDrawn);
        }

        if let Some(name) = &changes.name {
            reward.name.clone_from(name);
        }
        if let Some(description) = &changes.description {
            reward.description.clone_from(description);
        }
        if let Some(image) = &changes.image {
            reward.image.clone_from(image);
        }
        if let Some(draw_date) = changes.draw_date {
            reward.draw_date = draw_date;
        }
        if let Some(completed) = changes.completed {
            reward.completed = completed;
        }
        reward.updated_at = now;

        if let Some(images) = &changes.images {
            stored.images.clone_from(images);
        }
        if let Some(price) = changes.price {
            stored.terms.price = price;
        }
        if let Some(min_quota) = changes.min_quota {
            stored.terms.min_quota = min_quota;
        }
        Ok(stored.reward.clone())
    }

    async fn delete(&self, id: RewardId) -> Result<()> {
        let mut state = self.store.lock()?;
        if state.rewards.remove(&id).is_none() {
            return Err(RaffleError::reward_not_found(id));
        }
        state.numbers.retain(|row| row.reward_id != id);
        Ok(())
    }

    async fn buy_numbers(
        &self,
        reward: RewardId,
        buyer: UserId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>> {
        let mut state = self.store.lock()?;
        let stored = state.reward(reward)?;
        if stored.reward.completed {
            return Err(RaffleError::RewardCompleted);
        }
        let min_quota = stored.terms.min_quota;
        if !state.users.contains_key(&buyer) {
            return Err(RaffleError::user_not_found(buyer));
        }

        let highest = state.sold(reward).map(|row| row.number).max();
        let range = next_range(highest, quantity, min_quota)?;

        state.numbers.extend(range.numbers().map(|number| SoldRow {
            reward_id: reward,
            number,
            user_id: buyer,
            purchased_at: now,
        }));
        Ok(range.to_vec())
    }

    async fn remove_buyer(&self, reward: RewardId, buyer: UserId) -> Result<u64> {
        let mut state = self.store.lock()?;
        if state.reward(reward)?.reward.is_drawn() {
            return Err(RaffleError::AlreadyDrawn);
        }
        let before = state.numbers.len();
        state
            .numbers
            .retain(|row| !(row.reward_id == reward && row.user_id == buyer));
        Ok(u64::try_from(before - state.numbers.len()).unwrap_or(u64::MAX))
    }

    async fn buyers(&self, reward: RewardId, page: PageRequest) -> Result<Page<BuyerSummary>> {
        let state = self.store.lock()?;
        state.reward(reward)?;
        Ok(paginate(state.buyer_summaries(reward)?, page))
    }

    async fn user_numbers(&self, reward: RewardId, buyer: UserId) -> Result<Vec<i32>> {
        let state = self.store.lock()?;
        state.reward(reward)?;
        let mut numbers: Vec<i32> = state
            .sold(reward)
            .filter(|row| row.user_id == buyer)
            .map(|row| row.number)
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    async fn user_purchases(&self, buyer: UserId, page: PageRequest) -> Result<Page<Purchase>> {
        let state = self.store.lock()?;

        let mut held: HashMap<RewardId, (Vec<i32>, DateTime<Utc>)> = HashMap::new();
        for row in state.numbers.iter().filter(|row| row.user_id == buyer) {
            let entry = held
                .entry(row.reward_id)
                .or_insert_with(|| (Vec::new(), row.purchased_at));
            entry.0.push(row.number);
            entry.1 = entry.1.min(row.purchased_at);
        }

        let mut grouped: Vec<(RewardId, Vec<i32>, DateTime<Utc>)> = held
            .into_iter()
            .map(|(reward, (numbers, first))| (reward, numbers, first))
            .collect();
        grouped.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        let total = i64::try_from(grouped.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

        let mut purchases = Vec::new();
        for (position, (reward_id, mut numbers, purchase_date)) in
            (page.offset().saturating_add(1)..).zip(grouped.into_iter().skip(offset).take(limit))
        {
            let stored = state.reward(reward_id)?;
            numbers.sort_unstable();
            let count = Decimal::from(numbers.len());
            purchases.push(Purchase {
                id: position,
                reward_id,
                reward_name: stored.reward.name.clone(),
                reward_image: stored.reward.image.clone(),
                numbers,
                purchase_date,
                total_amount: stored.terms.price * count,
                status: PurchaseStatus::from_completed(stored.reward.completed),
            });
        }
        Ok(Page::new(purchases, page, total))
    }

    async fn draw(&self, reward: RewardId, now: DateTime<Utc>) -> Result<DrawOutcome> {
        let mut guard = self.store.lock()?;
        let state = &mut *guard;

        if state.reward(reward)?.reward.is_drawn() {
            return Err(RaffleError::AlreadyDrawn);
        }
        let sold: Vec<SoldNumber> = state
            .sold(reward)
            .map(|row| SoldNumber {
                number: row.number,
                user_id: row.user_id,
            })
            .collect();
        let winner = pick_winner(&sold, &mut state.rng).ok_or(RaffleError::NoNumbersSold)?;
        let profile = state.profile(winner.user_id)?;

        let stored = state.reward_mut(reward)?;
        stored.reward.winner_number = Some(winner.number);
        stored.reward.drawn_at = Some(now);
        stored.reward.completed = true;
        stored.reward.updated_at = now;

        Ok(DrawOutcome {
            reward_id: reward,
            winner_number: winner.number,
            winner: profile,
            drawn_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers;
    use crate::mocks::test_clock;
    use raffle_core::environment::Clock;

    async fn seeded_reward(store: &InMemoryStore, min_quota: i32) -> (User, User, Reward) {
        let now = test_clock().now();
        let owner = store
            .users()
            .create(&helpers::user("Owner", "owner@example.com", now))
            .await
            .unwrap();
        let buyer = store
            .users()
            .create(&helpers::user("Buyer", "buyer@example.com", now))
            .await
            .unwrap();
        let reward = store
            .rewards()
            .create(&helpers::priced_reward(
                owner.id,
                "Bike",
                Decimal::new(250, 2),
                min_quota,
                now,
            ))
            .await
            .unwrap();
        (owner, buyer, reward)
    }

    #[tokio::test]
    async fn purchases_get_consecutive_ranges() {
        let store = InMemoryStore::seeded(1);
        let (owner, buyer, reward) = seeded_reward(&store, 1).await;
        let now = test_clock().now();
        let rewards = store.rewards();

        assert_eq!(rewards.buy_numbers(reward.id, buyer.id, 3, now).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(rewards.buy_numbers(reward.id, owner.id, 2, now).await.unwrap(), vec![4, 5]);
        assert_eq!(rewards.user_numbers(reward.id, buyer.id).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn min_quota_is_enforced() {
        let store = InMemoryStore::seeded(1);
        let (_, buyer, reward) = seeded_reward(&store, 5).await;
        let result = store
            .rewards()
            .buy_numbers(reward.id, buyer.id, 4, test_clock().now())
            .await;
        assert_eq!(
            result,
            Err(RaffleError::QuantityBelowMinimum { min: 5, requested: 4 })
        );
    }

    #[tokio::test]
    async fn draw_happens_once() {
        let store = InMemoryStore::seeded(42);
        let (_, buyer, reward) = seeded_reward(&store, 1).await;
        let now = test_clock().now();
        let rewards = store.rewards();

        assert_eq!(rewards.draw(reward.id, now).await, Err(RaffleError::NoNumbersSold));

        rewards.buy_numbers(reward.id, buyer.id, 10, now).await.unwrap();
        let outcome = rewards.draw(reward.id, now).await.unwrap();
        assert!((1..=10).contains(&outcome.winner_number));
        assert_eq!(outcome.winner.id, buyer.id);

        assert_eq!(rewards.draw(reward.id, now).await, Err(RaffleError::AlreadyDrawn));
        assert_eq!(
            rewards.buy_numbers(reward.id, buyer.id, 1, now).await,
            Err(RaffleError::RewardCompleted)
        );
        assert_eq!(
            rewards.remove_buyer(reward.id, buyer.id).await,
            Err(RaffleError::AlreadyDrawn)
        );

        let reopen = RewardChanges {
            completed: Some(false),
            ..RewardChanges::default()
        };
        assert_eq!(
            rewards.update(reward.id, &reopen, now).await,
            Err(RaffleError::AlreadyDrawn)
        );

        let details = rewards.get_details(reward.id).await.unwrap();
        assert_eq!(details.winner.map(|w| w.id), Some(buyer.id));
        assert!(details.reward.completed);
    }

    #[tokio::test]
    async fn purchase_history_totals_price() {
        let store = InMemoryStore::seeded(1);
        let (_, buyer, reward) = seeded_reward(&store, 1).await;
        let now = test_clock().now();
        store.rewards().buy_numbers(reward.id, buyer.id, 4, now).await.unwrap();

        let history = store
            .rewards()
            .user_purchases(buyer.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.pagination.total, 1);
        let purchase = &history.items[0];
        assert_eq!(purchase.id, 1);
        assert_eq!(purchase.numbers, vec![1, 2, 3, 4]);
        assert_eq!(purchase.total_amount, Decimal::new(1000, 2));
        assert_eq!(purchase.status, PurchaseStatus::Active);
    }

    #[tokio::test]
    async fn purchase_history_past_the_last_page_is_empty() {
        let store = InMemoryStore::seeded(1);
        let (_, buyer, reward) = seeded_reward(&store, 1).await;
        let now = test_clock().now();
        store.rewards().buy_numbers(reward.id, buyer.id, 1, now).await.unwrap();

        let history = store
            .rewards()
            .user_purchases(buyer.id, PageRequest::new(Some(i64::MAX), Some(100)))
            .await
            .unwrap();
        assert!(history.items.is_empty());
        assert_eq!(history.pagination.total, 1);
    }

    #[tokio::test]
    async fn referenced_user_cannot_be_deleted() {
        let store = InMemoryStore::seeded(1);
        let (owner, _, _) = seeded_reward(&store, 1).await;
        assert!(matches!(
            store.users().delete(owner.id).await,
            Err(RaffleError::Conflict(_))
        ));
    }
}
