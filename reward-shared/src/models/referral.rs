/// Referral code model and database operations
///
/// A user may own any number of referral codes; each code is globally
/// unique. Deleting the owning user removes their codes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE referral_codes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     code VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::error::{RewardError, RewardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const MAX_CODE_LEN: usize = 64;

/// Referral code row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferralCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a referral code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReferralCode {
    pub user_id: Uuid,
    pub code: String,
}

/// Trims and checks a referral code
pub fn normalize_code(raw: &str) -> RewardResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(RewardError::validation("referral code cannot be empty"));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(RewardError::validation(format!(
            "referral code must be at most {} characters",
            MAX_CODE_LEN
        )));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(RewardError::validation(
            "referral code cannot contain whitespace",
        ));
    }
    Ok(code.to_string())
}

impl ReferralCode {
    /// Creates a referral code for a user
    ///
    /// # Errors
    ///
    /// - `Validation` if the code is blank, too long or has whitespace
    /// - `NotFound` if the user does not exist
    /// - `AlreadyExists` if the code is taken
    pub async fn create(pool: &PgPool, data: CreateReferralCode) -> RewardResult<Self> {
        let code = normalize_code(&data.code)?;

        let referral = sqlx::query_as::<_, ReferralCode>(
            r#"
            INSERT INTO referral_codes (user_id, code)
            VALUES ($1, $2)
            RETURNING id, user_id, code, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(code)
        .fetch_one(pool)
        .await
        .map_err(map_owner_violation)?;

        tracing::info!(
            referral_id = %referral.id,
            user_id = %referral.user_id,
            "Referral code created"
        );
        Ok(referral)
    }

    /// Finds a referral code by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> RewardResult<Option<Self>> {
        let referral = sqlx::query_as::<_, ReferralCode>(
            "SELECT id, user_id, code, created_at, updated_at FROM referral_codes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(referral)
    }

    /// Finds a referral code by its code string
    pub async fn find_by_code(pool: &PgPool, code: &str) -> RewardResult<Option<Self>> {
        let referral = sqlx::query_as::<_, ReferralCode>(
            "SELECT id, user_id, code, created_at, updated_at FROM referral_codes WHERE code = $1",
        )
        .bind(code.trim())
        .fetch_optional(pool)
        .await?;

        Ok(referral)
    }

    /// Lists a user's referral codes, oldest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> RewardResult<Vec<Self>> {
        let referrals = sqlx::query_as::<_, ReferralCode>(
            r#"
            SELECT id, user_id, code, created_at, updated_at
            FROM referral_codes
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(referrals)
    }

    /// Replaces the code string
    ///
    /// # Errors
    ///
    /// - `NotFound` if the referral code does not exist
    /// - `AlreadyExists` if the new code is taken
    pub async fn update_code(pool: &PgPool, id: Uuid, code: &str) -> RewardResult<Self> {
        let code = normalize_code(code)?;

        let referral = sqlx::query_as::<_, ReferralCode>(
            r#"
            UPDATE referral_codes
            SET code = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, code, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RewardError::not_found("referral code not found"))?;

        tracing::info!(referral_id = %id, "Referral code updated");
        Ok(referral)
    }

    /// Deletes a referral code; returns true if a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> RewardResult<bool> {
        let result = sqlx::query("DELETE FROM referral_codes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_owner_violation(err: sqlx::Error) -> RewardError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_foreign_key_violation() {
            return RewardError::not_found("user not found");
        }
    }
    RewardError::from(err)
}
