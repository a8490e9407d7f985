/// Task status transitions with completion crediting
///
/// Moving a task into "completed" from any other state credits the acting
/// user with one completed task. The task row is locked for the whole
/// transition, so concurrent requests that both try to complete the same
/// task are serialized: the first sees the old status and credits, the
/// second sees "completed" and does not.
///
/// Any status may move to any other; repeated writes of the same status
/// are accepted and only bump `updated_at`.

use crate::error::{RewardError, RewardResult};
use crate::models::task::{Task, TaskStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Serializes status changes per task and applies completion credit
#[derive(Debug, Clone)]
pub struct StatusTransitionCoordinator {
    pool: PgPool,
}

impl StatusTransitionCoordinator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sets a task's status and credits `acting_user_id` on completion
    ///
    /// `new_status` is the wire value (1–4).
    ///
    /// # Errors
    ///
    /// - `Validation` if `new_status` is not a known status
    /// - `NotFound` if the task does not exist
    /// - `Validation` if completion credit targets a missing user
    pub async fn transition_status(
        &self,
        task_id: Uuid,
        new_status: i32,
        acting_user_id: Uuid,
    ) -> RewardResult<Task> {
        let target = TaskStatus::from_code(new_status)
            .ok_or_else(|| RewardError::validation("status does not exist"))?;

        let mut tx = self.pool.begin().await?;

        let current = Task::lock_status(&mut *tx, task_id)
            .await?
            .ok_or_else(|| RewardError::not_found("task not found"))?;

        let credited = current.credits_completion(target);
        if credited {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET tasks_completed = tasks_completed + 1, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(acting_user_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tracing::warn!(
                    task_id = %task_id,
                    user_id = %acting_user_id,
                    "Completion credit for unknown user"
                );
                return Err(RewardError::validation("acting user does not exist"));
            }
        }

        let task = Task::write_status(&mut *tx, task_id, target).await?;

        tx.commit().await?;

        tracing::info!(
            task_id = %task_id,
            user_id = %acting_user_id,
            from = current.code(),
            to = target.code(),
            credited,
            "Task status changed"
        );
        Ok(task)
    }
}
