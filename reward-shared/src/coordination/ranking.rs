/// Leaderboard reads
///
/// Users are ranked by balance, highest first. Ties share a rank and the
/// next rank skips ahead (1, 2, 2, 4), so a user's rank is always one more
/// than the number of users with a strictly greater balance.

use crate::error::{RewardError, RewardResult};
use crate::models::user::UserStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub balance: f64,
    pub referrals: i32,
    pub tasks_completed: i32,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,

    /// 1-based position by balance
    pub rank: i64,
}

/// Read-only ranking queries
#[derive(Debug, Clone)]
pub struct RankingReader {
    pool: PgPool,
}

impl RankingReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the user's 1-based rank by balance
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    pub async fn rank(&self, user_id: Uuid) -> RewardResult<i64> {
        let rank: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 + (SELECT COUNT(*) FROM users other WHERE other.balance > u.balance)
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        rank.ok_or_else(|| RewardError::not_found("user not found"))
    }

    /// Returns the user with the highest balance, if any
    ///
    /// Ties go to the earliest-created user.
    pub async fn leader(&self) -> RewardResult<Option<RankedUser>> {
        Ok(self.top_users(1, 0).await?.into_iter().next())
    }

    /// Returns one page of the leaderboard
    ///
    /// # Errors
    ///
    /// - `Validation` if `limit` is not positive or `offset` is negative
    pub async fn top_users(&self, limit: i64, offset: i64) -> RewardResult<Vec<RankedUser>> {
        if limit <= 0 {
            return Err(RewardError::validation("limit must be positive"));
        }
        if offset < 0 {
            return Err(RewardError::validation("offset cannot be negative"));
        }

        let users = sqlx::query_as::<_, RankedUser>(
            r#"
            SELECT id, username, email, balance, referrals, tasks_completed, status, created_at,
                   RANK() OVER (ORDER BY balance DESC) AS rank
            FROM users
            ORDER BY balance DESC, created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
