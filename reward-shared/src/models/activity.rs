/// User visit log
///
/// Every recorded visit is one row. The visit count, the last visit and the
/// weekly and monthly activity figures are all computed from these rows, so
/// nothing on `users` has to be kept in sync with the log.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_activity (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     visited_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use reward_shared::models::activity::{UserActivity, UserFullInfo};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// UserActivity::record_visit(&pool, user_id).await?;
///
/// let info = UserFullInfo::load(&pool, user_id).await?;
/// assert!(info.activity.visit_count >= 1);
/// # Ok(())
/// # }
/// ```

use crate::error::{RewardError, RewardResult};
use crate::models::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One recorded visit
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub visited_at: DateTime<Utc>,
}

/// Visit figures for one user
///
/// `weekly` and `monthly` count visits in the last 7 days and the last
/// calendar month before the reference time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityStats {
    pub visit_count: i64,
    pub last_visit: Option<DateTime<Utc>>,
    pub weekly: i64,
    pub monthly: i64,
}

/// A user together with their visit figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFullInfo {
    #[serde(flatten)]
    pub user: User,
    pub activity: ActivityStats,
}

impl UserActivity {
    /// Records a visit at the current time
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    pub async fn record_visit(pool: &PgPool, user_id: Uuid) -> RewardResult<Self> {
        Self::record_visit_at(pool, user_id, Utc::now()).await
    }

    /// Records a visit at `visited_at`
    pub async fn record_visit_at(
        pool: &PgPool,
        user_id: Uuid,
        visited_at: DateTime<Utc>,
    ) -> RewardResult<Self> {
        let visit = sqlx::query_as::<_, UserActivity>(
            r#"
            INSERT INTO user_activity (user_id, visited_at)
            VALUES ($1, $2)
            RETURNING id, user_id, visited_at
            "#,
        )
        .bind(user_id)
        .bind(visited_at)
        .fetch_one(pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RewardError::not_found("user not found")
            }
            other => RewardError::from(other),
        })?;

        tracing::debug!(user_id = %user_id, "Visit recorded");
        Ok(visit)
    }

    /// Lists a user's visits, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> RewardResult<Vec<Self>> {
        let visits = sqlx::query_as::<_, UserActivity>(
            r#"
            SELECT id, user_id, visited_at
            FROM user_activity
            WHERE user_id = $1
            ORDER BY visited_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(visits)
    }

    /// Computes a user's visit figures as of `now`
    ///
    /// Visits after `now` count towards the total but not towards either
    /// window.
    pub async fn stats(
        pool: &PgPool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> RewardResult<ActivityStats> {
        let stats = sqlx::query_as::<_, ActivityStats>(
            r#"
            SELECT
                COUNT(*) AS visit_count,
                MAX(visited_at) AS last_visit,
                COUNT(*) FILTER (
                    WHERE visited_at > $2::TIMESTAMPTZ - INTERVAL '7 days' AND visited_at <= $2
                ) AS weekly,
                COUNT(*) FILTER (
                    WHERE visited_at > $2::TIMESTAMPTZ - INTERVAL '1 month' AND visited_at <= $2
                ) AS monthly
            FROM user_activity
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(stats)
    }
}

impl UserFullInfo {
    /// Loads a user with their visit figures as of now
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    pub async fn load(pool: &PgPool, user_id: Uuid) -> RewardResult<Self> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| RewardError::not_found("user not found"))?;

        let activity = UserActivity::stats(pool, user_id, Utc::now()).await?;

        Ok(Self { user, activity })
    }
}
