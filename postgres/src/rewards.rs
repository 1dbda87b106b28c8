//! `PostgreSQL` reward repository.
//!
//! # Number sales
//!
//! ```text
//! BEGIN
//!   SELECT ... FROM rewards WHERE id = $1 FOR UPDATE     -- serializes buyers of this reward
//!   SELECT MAX(number) FROM reward_buyers WHERE reward_id = $1
//!   INSERT INTO reward_buyers ... generate_series(first, last)
//! COMMIT
//! ```
//!
//! The draw takes the same row lock, so a purchase and the draw of one
//! reward can never interleave. `UNIQUE (reward_id, number)` backs the lock up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use raffle_core::allocation::next_range;
use raffle_core::draw::pick_winner;
use raffle_core::{
    BuyerSummary, Decimal, DrawOutcome, NewReward, Page, PageRequest, Purchase, PurchaseStatus,
    RaffleError, Result, Reward, RewardChanges, RewardDetails, RewardId, RewardRepository,
    RewardTerms, SoldNumber, User, UserId,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::map_db_error;
use crate::users::UserRow;

const REWARD_COLUMNS: &str = "id, owner_id, name, description, image, draw_date, completed, \
                              winner_number, drawn_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct RewardRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: String,
    image: String,
    draw_date: DateTime<Utc>,
    completed: bool,
    winner_number: Option<i32>,
    drawn_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RewardRow> for Reward {
    fn from(row: RewardRow) -> Self {
        Self {
            id: RewardId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            name: row.name,
            description: row.description,
            image: row.image,
            draw_date: row.draw_date,
            completed: row.completed,
            winner_number: row.winner_number,
            drawn_at: row.drawn_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BuyerRow {
    #[sqlx(flatten)]
    user: UserRow,
    total_numbers: i64,
}

impl TryFrom<BuyerRow> for BuyerSummary {
    type Error = RaffleError;

    fn try_from(row: BuyerRow) -> Result<Self> {
        let user = User::try_from(row.user)?;
        Ok(Self {
            user: user.profile(),
            total_numbers: row.total_numbers,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    reward_id: Uuid,
    reward_name: String,
    reward_image: String,
    completed: bool,
    numbers: Vec<i32>,
    purchase_date: DateTime<Utc>,
    total_amount: Decimal,
}

/// Reward row lock state read at the start of a sale or draw.
#[derive(Debug, sqlx::FromRow)]
struct LockedReward {
    completed: bool,
    winner_number: Option<i32>,
    min_quota: i32,
}

/// Escape `%`, `_` and `\` so a search term matches literally inside `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Lock the reward row for the rest of the transaction.
async fn lock_reward(conn: &mut PgConnection, id: RewardId) -> Result<LockedReward> {
    sqlx::query_as::<_, LockedReward>(
        r"
        SELECT r.completed, r.winner_number, COALESCE(d.min_quota, 1) AS min_quota
        FROM rewards r
        LEFT JOIN reward_details d ON d.reward_id = r.id
        WHERE r.id = $1
        FOR UPDATE OF r
        ",
    )
    .bind(id.as_uuid())
    .fetch_optional(conn)
    .await
    .map_err(map_db_error("lock reward"))?
    .ok_or_else(|| RaffleError::reward_not_found(id))
}

async fn replace_images(conn: &mut PgConnection, id: RewardId, images: &[String]) -> Result<()> {
    sqlx::query("DELETE FROM reward_images WHERE reward_id = $1")
        .bind(id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(map_db_error("clear reward images"))?;

    if images.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r"
        INSERT INTO reward_images (reward_id, url, position)
        SELECT $1, url, ord::INTEGER
        FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS t(url, ord)
        ",
    )
    .bind(id.as_uuid())
    .bind(images)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error("insert reward images"))?;
    Ok(())
}

async fn fetch_terms(conn: &mut PgConnection, id: RewardId) -> Result<RewardTerms> {
    let terms: Option<(Decimal, i32)> =
        sqlx::query_as("SELECT price, min_quota FROM reward_details WHERE reward_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(map_db_error("get reward terms"))?;

    Ok(terms.map_or_else(RewardTerms::default, |(price, min_quota)| RewardTerms {
        price,
        min_quota,
    }))
}

async fn fetch_winner(conn: &mut PgConnection, id: RewardId, number: i32) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        r"
        SELECT u.id, u.name, u.email, u.password_hash, u.role, u.active, u.created_at, u.updated_at
        FROM reward_buyers rb
        JOIN users u ON u.id = rb.user_id
        WHERE rb.reward_id = $1 AND rb.number = $2
        ",
    )
    .bind(id.as_uuid())
    .bind(number)
    .fetch_optional(conn)
    .await
    .map_err(map_db_error("get winner"))?;

    row.map(User::try_from).transpose()
}

/// Buyers of a reward, most numbers first. `limit = None` returns all of them.
async fn fetch_buyers(
    conn: &mut PgConnection,
    id: RewardId,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<BuyerSummary>> {
    let rows: Vec<BuyerRow> = sqlx::query_as(
        r"
        SELECT u.id, u.name, u.email, u.password_hash, u.role, u.active, u.created_at, u.updated_at,
               COUNT(*) AS total_numbers
        FROM reward_buyers rb
        JOIN users u ON u.id = rb.user_id
        WHERE rb.reward_id = $1
        GROUP BY u.id
        ORDER BY total_numbers DESC, MIN(rb.number) ASC
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(id.as_uuid())
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await
    .map_err(map_db_error("list buyers"))?;

    rows.into_iter().map(BuyerSummary::try_from).collect()
}

/// `PostgreSQL` reward repository.
#[derive(Debug, Clone)]
pub struct PostgresRewardRepository {
    pool: PgPool,
}

impl PostgresRewardRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_exists(&self, id: RewardId) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rewards WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error("check reward"))?;

        if exists {
            Ok(())
        } else {
            Err(RaffleError::reward_not_found(id))
        }
    }

    async fn list_where(
        &self,
        owner: Option<UserId>,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Reward>> {
        let owner = owner.map(|id| *id.as_uuid());
        let pattern = search.map(like_pattern);
        let filter = r"
            ($1::UUID IS NULL OR owner_id = $1)
            AND ($2::TEXT IS NULL OR name ILIKE $2 OR description ILIKE $2)
        ";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM rewards WHERE {filter}"))
            .bind(owner)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error("count rewards"))?;

        let rows: Vec<RewardRow> = sqlx::query_as(&format!(
            r"
            SELECT {REWARD_COLUMNS}
            FROM rewards
            WHERE {filter}
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(owner)
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("list rewards"))?;

        Ok(Page::new(
            rows.into_iter().map(Reward::from).collect(),
            page,
            total,
        ))
    }
}

#[async_trait]
impl RewardRepository for PostgresRewardRepository {
    async fn create(&self, new: &NewReward) -> Result<Reward> {
        let mut tx = self.pool.begin().await.map_err(map_db_error("begin"))?;

        let row: RewardRow = sqlx::query_as(&format!(
            r"
            INSERT INTO rewards (id, owner_id, name, description, image, draw_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {REWARD_COLUMNS}
            "
        ))
        .bind(new.id.as_uuid())
        .bind(new.owner_id.as_uuid())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.image)
        .bind(new.draw_date)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error("create reward"))?;

        sqlx::query("INSERT INTO reward_details (reward_id, price, min_quota) VALUES ($1, $2, $3)")
            .bind(new.id.as_uuid())
            .bind(new.terms.price)
            .bind(new.terms.min_quota)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error("create reward terms"))?;

        replace_images(&mut tx, new.id, &new.images).await?;

        tx.commit().await.map_err(map_db_error("commit reward"))?;

        tracing::debug!(reward_id = %new.id, owner_id = %new.owner_id, "Reward inserted");
        Ok(row.into())
    }

    async fn get(&self, id: RewardId) -> Result<Reward> {
        sqlx::query_as::<_, RewardRow>(&format!("SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("get reward"))?
            .map(Reward::from)
            .ok_or_else(|| RaffleError::reward_not_found(id))
    }

    async fn get_details(&self, id: RewardId) -> Result<RewardDetails> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error("acquire"))?;

        let reward: Reward = sqlx::query_as::<_, RewardRow>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error("get reward"))?
        .map(Reward::from)
        .ok_or_else(|| RaffleError::reward_not_found(id))?;

        let images: Vec<String> = sqlx::query_scalar(
            "SELECT url FROM reward_images WHERE reward_id = $1 ORDER BY position, id",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *conn)
        .await
        .map_err(map_db_error("get reward images"))?;

        let terms = fetch_terms(&mut conn, id).await?;
        let buyers = fetch_buyers(&mut conn, id, None, 0).await?;
        let winner = match reward.winner_number {
            Some(number) => fetch_winner(&mut conn, id, number)
                .await?
                .map(|user| user.profile()),
            None => None,
        };

        Ok(RewardDetails {
            reward,
            images,
            terms,
            buyers,
            winner,
        })
    }

    async fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<Reward>> {
        self.list_where(None, search, page).await
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Page<Reward>> {
        self.list_where(Some(owner), None, page).await
    }

    async fn update(&self, id: RewardId, changes: &RewardChanges, now: DateTime<Utc>) -> Result<Reward> {
        let mut tx = self.pool.begin().await.map_err(map_db_error("begin"))?;

        let row: RewardRow = sqlx::query_as::<_, RewardRow>(&format!(
            r"
            UPDATE rewards
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                image = COALESCE($4, image),
                draw_date = COALESCE($5, draw_date),
                completed = COALESCE($6, completed),
                updated_at = $7
            WHERE id = $1
            RETURNING {REWARD_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.image.as_deref())
        .bind(changes.draw_date)
        .bind(changes.completed)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error("update reward"))?
        .ok_or_else(|| RaffleError::reward_not_found(id))?;

        if changes.price.is_some() || changes.min_quota.is_some() {
            sqlx::query(
                r"
                INSERT INTO reward_details (reward_id, price, min_quota)
                VALUES ($1, COALESCE($2, 0), COALESCE($3, 1))
                ON CONFLICT (reward_id) DO UPDATE
                SET price = COALESCE($2, reward_details.price),
                    min_quota = COALESCE($3, reward_details.min_quota)
                ",
            )
            .bind(id.as_uuid())
            .bind(changes.price)
            .bind(changes.min_quota)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error("update reward terms"))?;
        }

        if let Some(images) = &changes.images {
            replace_images(&mut tx, id, images).await?;
        }

        tx.commit().await.map_err(map_db_error("commit reward update"))?;
        Ok(row.into())
    }

    async fn delete(&self, id: RewardId) -> Result<()> {
        let result = sqlx::query("DELETE FROM rewards WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error("delete reward"))?;

        if result.rows_affected() == 0 {
            return Err(RaffleError::reward_not_found(id));
        }
        Ok(())
    }

    async fn buy_numbers(
        &self,
        reward: RewardId,
        buyer: UserId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error("begin"))?;

        let locked = lock_reward(&mut tx, reward).await?;
        if locked.completed {
            return Err(RaffleError::RewardCompleted);
        }

        let buyer_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(buyer.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error("check buyer"))?;
        if !buyer_exists {
            return Err(RaffleError::user_not_found(buyer));
        }

        let highest: Option<i32> =
            sqlx::query_scalar("SELECT MAX(number) FROM reward_buyers WHERE reward_id = $1")
                .bind(reward.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_error("read highest number"))?;

        let range = next_range(highest, quantity, locked.min_quota)?;

        sqlx::query(
            r"
            INSERT INTO reward_buyers (reward_id, user_id, number, purchased_at)
            SELECT $1, $2, n, $5
            FROM generate_series($3::INTEGER, $4::INTEGER) AS n
            ",
        )
        .bind(reward.as_uuid())
        .bind(buyer.as_uuid())
        .bind(range.first())
        .bind(range.last())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error("insert numbers"))?;

        tx.commit().await.map_err(map_db_error("commit purchase"))?;

        tracing::info!(
            reward_id = %reward,
            user_id = %buyer,
            first = range.first(),
            last = range.last(),
            "Numbers sold"
        );
        Ok(range.to_vec())
    }

    async fn remove_buyer(&self, reward: RewardId, buyer: UserId) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_db_error("begin"))?;

        if lock_reward(&mut tx, reward).await?.winner_number.is_some() {
            return Err(RaffleError::AlreadyDrawn);
        }

        let removed = sqlx::query("DELETE FROM reward_buyers WHERE reward_id = $1 AND user_id = $2")
            .bind(reward.as_uuid())
            .bind(buyer.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error("remove buyer"))?
            .rows_affected();

        tx.commit().await.map_err(map_db_error("commit buyer removal"))?;

        tracing::info!(reward_id = %reward, user_id = %buyer, removed, "Buyer removed");
        Ok(removed)
    }

    async fn buyers(&self, reward: RewardId, page: PageRequest) -> Result<Page<BuyerSummary>> {
        self.ensure_exists(reward).await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM reward_buyers WHERE reward_id = $1")
                .bind(reward.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error("count buyers"))?;

        let mut conn = self.pool.acquire().await.map_err(map_db_error("acquire"))?;
        let buyers = fetch_buyers(&mut conn, reward, Some(page.limit()), page.offset()).await?;
        Ok(Page::new(buyers, page, total))
    }

    async fn user_numbers(&self, reward: RewardId, buyer: UserId) -> Result<Vec<i32>> {
        self.ensure_exists(reward).await?;

        sqlx::query_scalar(
            "SELECT number FROM reward_buyers WHERE reward_id = $1 AND user_id = $2 ORDER BY number",
        )
        .bind(reward.as_uuid())
        .bind(buyer.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("list user numbers"))
    }

    async fn user_purchases(&self, buyer: UserId, page: PageRequest) -> Result<Page<Purchase>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT reward_id) FROM reward_buyers WHERE user_id = $1")
                .bind(buyer.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error("count purchases"))?;

        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r"
            SELECT r.id AS reward_id,
                   r.name AS reward_name,
                   r.image AS reward_image,
                   r.completed,
                   ARRAY_AGG(rb.number ORDER BY rb.number) AS numbers,
                   MIN(rb.purchased_at) AS purchase_date,
                   COALESCE(d.price, 0) * COUNT(*) AS total_amount
            FROM reward_buyers rb
            JOIN rewards r ON r.id = rb.reward_id
            LEFT JOIN reward_details d ON d.reward_id = r.id
            WHERE rb.user_id = $1
            GROUP BY r.id, d.price
            ORDER BY purchase_date DESC, r.id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(buyer.as_uuid())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("list purchases"))?;

        let purchases = (page.offset().saturating_add(1)..)
            .zip(rows)
            .map(|(id, row)| Purchase {
                id,
                reward_id: RewardId::from_uuid(row.reward_id),
                reward_name: row.reward_name,
                reward_image: row.reward_image,
                numbers: row.numbers,
                purchase_date: row.purchase_date,
                total_amount: row.total_amount,
                status: PurchaseStatus::from_completed(row.completed),
            })
            .collect();
        Ok(Page::new(purchases, page, total))
    }

    async fn draw(&self, reward: RewardId, now: DateTime<Utc>) -> Result<DrawOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error("begin"))?;

        if lock_reward(&mut tx, reward).await?.winner_number.is_some() {
            return Err(RaffleError::AlreadyDrawn);
        }

        let sold: Vec<SoldNumber> = sqlx::query_as::<_, (i32, Uuid)>(
            "SELECT number, user_id FROM reward_buyers WHERE reward_id = $1 ORDER BY number",
        )
        .bind(reward.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error("load sold numbers"))?
        .into_iter()
        .map(|(number, user_id)| SoldNumber {
            number,
            user_id: UserId::from_uuid(user_id),
        })
        .collect();

        let winner =
            pick_winner(&sold, &mut StdRng::from_entropy()).ok_or(RaffleError::NoNumbersSold)?;

        sqlx::query(
            r"
            UPDATE rewards
            SET winner_number = $2, drawn_at = $3, completed = TRUE, updated_at = $3
            WHERE id = $1
            ",
        )
        .bind(reward.as_uuid())
        .bind(winner.number)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error("record winner"))?;

        let winner_user = fetch_winner(&mut tx, reward, winner.number)
            .await?
            .ok_or_else(|| RaffleError::user_not_found(winner.user_id))?;

        tx.commit().await.map_err(map_db_error("commit draw"))?;

        tracing::info!(
            reward_id = %reward,
            winner_number = winner.number,
            winner_id = %winner.user_id,
            sold = sold.len(),
            "Reward drawn"
        );

        Ok(DrawOutcome {
            reward_id: reward,
            winner_number: winner.number,
            winner: winner_user.profile(),
            drawn_at: now,
        })
    }
}
