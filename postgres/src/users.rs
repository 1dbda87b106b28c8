//! `PostgreSQL` user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raffle_core::{
    Page, PageRequest, RaffleError, Result, Role, User, UserChanges, UserId, UserRepository,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::map_db_error;

pub(crate) const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, active, created_at, updated_at";

/// A `users` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RaffleError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .map_err(|_| RaffleError::Database(format!("Invalid role in database: {}", row.role)))?;
        Ok(Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` user repository.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (id, name, email, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("create user"))?;

        tracing::debug!(user_id = %user.id, "User inserted");
        row.try_into()
    }

    async fn get_by_id(&self, id: UserId) -> Result<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("get user"))?
            .ok_or_else(|| RaffleError::user_not_found(id))?
            .try_into()
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("get user by email"))?
            .ok_or_else(|| RaffleError::NotFound {
                resource: "User",
                id: email.to_string(),
            })?
            .try_into()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error("check email"))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error("count users"))?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("list users"))?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(users, page, total))
    }

    async fn update(&self, id: UserId, changes: &UserChanges, now: DateTime<Utc>) -> Result<User> {
        sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                active = COALESCE($5, active),
                updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.role.map(|role| role.as_str()))
        .bind(changes.active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("update user"))?
        .ok_or_else(|| RaffleError::user_not_found(id))?
        .try_into()
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error("delete user"))?;

        if result.rows_affected() == 0 {
            return Err(RaffleError::user_not_found(id));
        }
        Ok(())
    }
}
