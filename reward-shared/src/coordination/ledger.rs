/// Balance ledger
///
/// The only writer of `users.balance` outside the invite flow. Every
/// adjustment locks the user row, checks that the balance stays
/// non-negative and writes the new value in the same transaction, so two
/// concurrent debits can never both pass the check against the same
/// starting balance.
///
/// # Example
///
/// ```no_run
/// use reward_shared::coordination::Ledger;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = Ledger::new(pool);
///
/// let balance = ledger.adjust_balance(user_id, 25.0).await?;
/// let balance = ledger.adjust_balance(user_id, -5.0).await?;
/// assert_eq!(balance, 20.0);
/// # Ok(())
/// # }
/// ```

use crate::error::{RewardError, RewardResult};
use crate::models::user::User;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Balance adjustments with a non-negative floor
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds `delta` (positive or negative) to a user's balance
    ///
    /// Returns the balance after the adjustment.
    ///
    /// # Errors
    ///
    /// - `Validation` if `delta` is NaN or infinite
    /// - `NotFound` if the user does not exist
    /// - `Validation` if the balance would drop below zero or overflow
    pub async fn adjust_balance(&self, user_id: Uuid, delta: f64) -> RewardResult<f64> {
        check_delta(delta)?;

        let mut tx = self.pool.begin().await?;

        let user = User::find_by_id_for_update(&mut *tx, user_id)
            .await?
            .ok_or_else(|| RewardError::not_found("user not found"))?;

        let balance = next_balance(user.balance, delta).map_err(|err| {
            tracing::warn!(
                user_id = %user_id,
                balance = user.balance,
                delta,
                "Rejected balance adjustment"
            );
            err
        })?;

        sqlx::query("UPDATE users SET balance = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, delta, balance, "Balance adjusted");
        Ok(balance)
    }

    /// Credits an invite bonus and one referral in a single statement
    ///
    /// Runs on the caller's executor so it joins the invite transaction.
    /// The caller must already hold the user row lock.
    pub async fn credit_referral<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        bonus: f64,
    ) -> RewardResult<()> {
        check_bonus(bonus)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + $2,
                referrals = referrals + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(bonus)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RewardError::not_found("user not found"));
        }
        Ok(())
    }
}

fn check_delta(delta: f64) -> RewardResult<()> {
    if !delta.is_finite() {
        return Err(RewardError::validation("amount must be a finite number"));
    }
    Ok(())
}

/// Invite bonuses are credits, never debits
pub(crate) fn check_bonus(bonus: f64) -> RewardResult<()> {
    if !bonus.is_finite() || bonus < 0.0 {
        return Err(RewardError::validation(
            "bonus must be a finite, non-negative number",
        ));
    }
    Ok(())
}

/// Computes the balance after applying `delta`, refusing to go negative
/// or past the largest representable amount
pub fn next_balance(current: f64, delta: f64) -> RewardResult<f64> {
    let balance = current + delta;
    if !balance.is_finite() {
        return Err(RewardError::validation("balance would overflow"));
    }
    if balance < 0.0 {
        return Err(RewardError::validation("insufficient balance"));
    }
    Ok(balance)
}
