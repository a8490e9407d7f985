/// Referral invites
///
/// An invite creates a pending account for the invitee and credits the
/// inviter with the bonus and one referral, all in one transaction. The
/// inviter row stays locked until commit; the unique email index settles
/// races between two invites for the same address, so an email is only
/// ever credited once.
///
/// # Example
///
/// ```no_run
/// use reward_shared::coordination::ReferralInviteCoordinator;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, inviter_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let invites = ReferralInviteCoordinator::new(pool, 10.0);
/// invites.invite(inviter_id, "friend@example.com").await?;
/// # Ok(())
/// # }
/// ```

use crate::coordination::ledger::{check_bonus, Ledger};
use crate::error::{RewardError, RewardResult};
use crate::models::invite::Invite;
use crate::models::user::{normalize_email, username_from_email, User, UserStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Bonus credited to the inviter when no other amount is configured
pub const DEFAULT_INVITE_BONUS: f64 = 10.0;

/// Creates pending invitees and credits their inviters
#[derive(Debug, Clone)]
pub struct ReferralInviteCoordinator {
    pool: PgPool,
    bonus: f64,
}

impl ReferralInviteCoordinator {
    pub fn new(pool: PgPool, bonus: f64) -> Self {
        Self { pool, bonus }
    }

    pub fn bonus(&self) -> f64 {
        self.bonus
    }

    /// Invites `invitee_email` on behalf of `inviter_id`
    ///
    /// # Errors
    ///
    /// - `Validation` if the configured bonus is negative or not finite
    /// - `BadRequest` if the email is malformed
    /// - `NotFound` if the inviter does not exist
    /// - `Validation` if the inviter is itself still pending
    /// - `AlreadyExists` if a user with that email exists
    pub async fn invite(&self, inviter_id: Uuid, invitee_email: &str) -> RewardResult<()> {
        check_bonus(self.bonus)?;
        let email = normalize_email(invitee_email)?;

        let mut tx = self.pool.begin().await?;

        let inviter = User::find_by_id_for_update(&mut *tx, inviter_id)
            .await?
            .ok_or_else(|| RewardError::not_found("inviter not found"))?;

        if inviter.status == UserStatus::Pending {
            tracing::warn!(inviter_id = %inviter_id, "Pending user tried to invite");
            return Err(RewardError::validation("inviter has not activated their account"));
        }

        if User::find_by_email(&mut *tx, &email).await?.is_some() {
            return Err(RewardError::already_exists("user already exists"));
        }

        // A concurrent invite for the same address may commit between the
        // check above and this insert; the unique index turns that into zero rows.
        let invitee_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(username_from_email(&email))
        .bind(&email)
        .bind(UserStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RewardError::already_exists("user already exists"))?;

        Invite::record(&mut *tx, inviter_id, invitee_id, &email, self.bonus).await?;
        Ledger::credit_referral(&mut *tx, inviter_id, self.bonus).await?;

        tx.commit().await?;

        tracing::info!(
            inviter_id = %inviter_id,
            invitee_id = %invitee_id,
            bonus = self.bonus,
            "Invite accepted"
        );
        Ok(())
    }
}
