/// Invite records
///
/// One row per successful invite, written inside the same transaction that
/// creates the pending invitee and credits the inviter. The unique
/// `invitee_email` column is a second backstop against double crediting
/// next to the unique `users.email`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invites (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     inviter_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     invitee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     invitee_email VARCHAR(255) NOT NULL UNIQUE,
///     bonus DOUBLE PRECISION NOT NULL CHECK (bonus >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::error::RewardResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Invite row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub invitee_email: String,

    /// Balance credited to the inviter for this invite
    pub bonus: f64,

    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// Records an invite; call inside the crediting transaction
    pub async fn record<'e>(
        executor: impl PgExecutor<'e>,
        inviter_id: Uuid,
        invitee_id: Uuid,
        invitee_email: &str,
        bonus: f64,
    ) -> RewardResult<Self> {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO invites (inviter_id, invitee_id, invitee_email, bonus)
            VALUES ($1, $2, $3, $4)
            RETURNING id, inviter_id, invitee_id, invitee_email, bonus, created_at
            "#,
        )
        .bind(inviter_id)
        .bind(invitee_id)
        .bind(invitee_email)
        .bind(bonus)
        .fetch_one(executor)
        .await?;

        Ok(invite)
    }

    /// Lists the invites sent by a user, newest first
    pub async fn list_by_inviter(pool: &PgPool, inviter_id: Uuid) -> RewardResult<Vec<Self>> {
        let invites = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, inviter_id, invitee_id, invitee_email, bonus, created_at
            FROM invites
            WHERE inviter_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(inviter_id)
        .fetch_all(pool)
        .await?;

        Ok(invites)
    }
}
