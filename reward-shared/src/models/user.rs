/// User model and database operations
///
/// Users carry three reward counters: `balance`, `referrals` and
/// `tasks_completed`. Those counters are never written from this module;
/// they change only inside the coordinators in [`crate::coordination`].
/// Profile fields (username, email, bio, ...) are edited through
/// [`UpdateUser`], a set of per-field overrides applied to a row loaded
/// `FOR UPDATE` and persisted in the same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     balance DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (balance >= 0),
///     referrals INTEGER NOT NULL DEFAULT 0 CHECK (referrals >= 0),
///     tasks_completed INTEGER NOT NULL DEFAULT 0 CHECK (tasks_completed >= 0),
///     referral_code VARCHAR(64),
///     bio TEXT,
///     time_zone VARCHAR(64),
///     status SMALLINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reward_shared::models::user::{User, CreateUser};
/// use reward_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let found = User::find_by_email(&pool, "Alice@Example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use crate::error::{RewardError, RewardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use validator::ValidateEmail;

const USER_COLUMNS: &str = "id, username, email, balance, referrals, tasks_completed, \
     referral_code, bio, time_zone, status, created_at, updated_at";

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Regular account
    Active = 0,

    /// Temporarily disabled
    Suspended = 1,

    /// Permanently disabled
    Banned = 2,

    /// Created by an invite, not yet activated
    Pending = 3,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Banned => "banned",
            UserStatus::Pending => "pending",
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

/// User row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub username: String,

    /// Email address, stored lowercased; unique across users
    pub email: String,

    /// Reward balance, never negative
    pub balance: f64,

    /// Number of successful invites
    pub referrals: i32,

    /// Number of tasks this user moved into the completed state
    pub tasks_completed: i32,

    /// Optional referral code shown on the profile
    pub referral_code: Option<String>,

    /// Free-text biography
    pub bio: Option<String>,

    /// IANA time zone name
    pub time_zone: Option<String>,

    /// Account status
    pub status: UserStatus,

    pub created_at: DateTime<Utc>,

    /// Bumped on every write, including counter changes
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub bio: Option<String>,
    pub time_zone: Option<String>,

    /// Defaults to [`UserStatus::Active`]
    #[serde(default)]
    pub status: UserStatus,
}

/// Per-field overrides for a user
///
/// `None` leaves the field untouched. For nullable columns `Some(None)`
/// clears the value. Reward counters are absent: balance goes
/// through the ledger, the other counters through their coordinators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub referral_code: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub time_zone: Option<Option<String>>,
    pub status: Option<UserStatus>,
}

impl UpdateUser {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.referral_code.is_none()
            && self.bio.is_none()
            && self.time_zone.is_none()
            && self.status.is_none()
    }

    /// Applies the overrides to a loaded user
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the new email is malformed
    /// - `Validation` if the new username is blank
    pub fn apply_to(self, user: &mut User) -> RewardResult<()> {
        if let Some(username) = self.username {
            let username = username.trim();
            if username.is_empty() {
                return Err(RewardError::validation("username cannot be empty"));
            }
            user.username = username.to_string();
        }
        if let Some(email) = self.email {
            user.email = normalize_email(&email)?;
        }
        if let Some(code) = self.referral_code {
            user.referral_code = code;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(tz) = self.time_zone {
            user.time_zone = tz;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        Ok(())
    }
}

/// Short projection of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub balance: f64,
    pub referrals: i32,
    pub tasks_completed: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            balance: user.balance,
            referrals: user.referrals,
            tasks_completed: user.tasks_completed,
            created_at: user.created_at,
        }
    }
}

/// Filter for listing users
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring match on username
    pub username: Option<String>,

    pub status: Option<UserStatus>,
}

/// Trims, lowercases and validates an email address
///
/// # Errors
///
/// Returns `BadRequest` if the address is empty or malformed.
pub fn normalize_email(raw: &str) -> RewardResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.as_str().validate_email() {
        return Err(RewardError::bad_request("invalid email format"));
    }
    Ok(email)
}

/// Derives a username from the local part of an email
///
/// `"new.user@example.com"` becomes `"new.user"`. Input is expected to be
/// normalized already; a string without `@` is returned whole.
pub fn username_from_email(email: &str) -> String {
    email
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(email)
        .to_string()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// - `Validation` if the username is blank
    /// - `BadRequest` if the email is malformed
    /// - `AlreadyExists` if the email is taken
    pub async fn create(pool: &PgPool, data: CreateUser) -> RewardResult<Self> {
        let username = data.username.trim().to_string();
        if username.is_empty() {
            return Err(RewardError::validation("username cannot be empty"));
        }
        let email = normalize_email(&data.email)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, referral_code, bio, time_zone, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(data.referral_code)
        .bind(data.bio)
        .bind(data.time_zone)
        .bind(data.status)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> RewardResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID and locks the row until the transaction ends
    pub async fn find_by_id_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> RewardResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    ///
    /// A malformed address simply finds nothing.
    pub async fn find_by_email<'e>(
        executor: impl PgExecutor<'e>,
        email: &str,
    ) -> RewardResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Lists users matching the filter, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> RewardResult<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::TEXT IS NULL OR username ILIKE '%' || $1 || '%')
              AND ($2::SMALLINT IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.username.as_deref())
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts users matching the filter
    pub async fn count(pool: &PgPool, filter: &UserFilter) -> RewardResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE ($1::TEXT IS NULL OR username ILIKE '%' || $1 || '%')
              AND ($2::SMALLINT IS NULL OR status = $2)
            "#,
        )
        .bind(filter.username.as_deref())
        .bind(filter.status)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Applies profile overrides atomically
    ///
    /// Loads the row `FOR UPDATE`, applies [`UpdateUser`] field by field and
    /// writes the result back before committing.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `BadRequest`/`Validation` from [`UpdateUser::apply_to`]
    /// - `AlreadyExists` if the new email is taken
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateUser) -> RewardResult<Self> {
        let mut tx = pool.begin().await?;

        let mut user = User::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| RewardError::not_found("user not found"))?;

        data.apply_to(&mut user)?;

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2,
                email = $3,
                referral_code = $4,
                bio = $5,
                time_zone = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.referral_code)
        .bind(&user.bio)
        .bind(&user.time_zone)
        .bind(user.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "User updated");
        Ok(updated)
    }

    /// Deletes a user by ID
    ///
    /// Returns true if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> RewardResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}
