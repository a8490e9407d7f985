/// Task model and database operations
///
/// Tasks are units of work that users complete to earn credit. The status
/// column is written in two places only: at creation (always "not started")
/// and by [`crate::coordination::StatusTransitionCoordinator`], which owns
/// the completed-task crediting rule. [`UpdateTask`] therefore edits
/// everything except the status.
///
/// # Statuses
///
/// ```text
/// 1 not started ─┐
/// 2 in progress ─┼─ any → any
/// 3 completed   ─┤   (entering 3 from a non-3 state credits the acting user)
/// 4 canceled    ─┘
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status SMALLINT NOT NULL DEFAULT 1 CHECK (status BETWEEN 1 AND 4),
///     due_date TIMESTAMPTZ,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::error::{RewardError, RewardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "id, title, description, status, due_date, assignee_id, created_at, updated_at";

/// Paragraph separator used when paging descriptions
const DESCRIPTION_SEPARATOR: &str = "\n\n";

/// Task status
///
/// Serialized as its wire value (1–4) both in JSON and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(into = "i16", try_from = "i16")]
pub enum TaskStatus {
    NotStarted = 1,
    InProgress = 2,
    Completed = 3,
    Canceled = 4,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Canceled,
    ];

    /// Parses a wire value; `None` for anything outside 1–4
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(TaskStatus::NotStarted),
            2 => Some(TaskStatus::InProgress),
            3 => Some(TaskStatus::Completed),
            4 => Some(TaskStatus::Canceled),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Canceled => "Canceled",
        }
    }

    /// True when moving from `self` to `target` is a completion event
    pub fn credits_completion(&self, target: TaskStatus) -> bool {
        *self != TaskStatus::Completed && target == TaskStatus::Completed
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

impl From<TaskStatus> for i16 {
    fn from(status: TaskStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i16> for TaskStatus {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        TaskStatus::from_code(code.into()).ok_or_else(|| format!("status {} does not exist", code))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,

    /// User the task is assigned to (nullable if the user was deleted)
    pub assignee_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// Per-field overrides for a task; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<Uuid>>,
}

impl UpdateTask {
    /// Applies the overrides to a loaded task
    pub fn apply_to(self, task: &mut Task) -> RewardResult<()> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(RewardError::validation("task title cannot be empty"));
            }
            task.title = title.to_string();
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        Ok(())
    }
}

/// Filter for listing tasks; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Case-insensitive substring match on title
    pub title: Option<String>,

    /// Case-insensitive substring match on description
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
    pub due_before: Option<DateTime<Utc>>,
}

/// One page of a task list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

/// One page of a task description, split on blank lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DescriptionPage {
    pub description: String,
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

/// Splits a description into paragraphs and returns the requested page
///
/// Pages are 1-based; `page < 1` is treated as 1 and `page_size < 1` as 10.
///
/// # Errors
///
/// - `NotFound` if the description is empty
/// - `NotFound` if the page is past the end
pub fn paginate_description(
    description: &str,
    page: usize,
    page_size: usize,
) -> RewardResult<DescriptionPage> {
    if description.is_empty() {
        return Err(RewardError::not_found("description not found"));
    }

    let page = page.max(1);
    let page_size = if page_size < 1 { 10 } else { page_size };

    let paragraphs: Vec<&str> = description.split(DESCRIPTION_SEPARATOR).collect();
    let total_pages = paragraphs.len().div_ceil(page_size);
    if page > total_pages {
        return Err(RewardError::not_found("page out of range"));
    }

    let start = (page - 1) * page_size;
    let end = start.saturating_add(page_size).min(paragraphs.len());

    Ok(DescriptionPage {
        description: paragraphs[start..end].join(DESCRIPTION_SEPARATOR),
        current_page: page,
        total_pages,
        page_size,
    })
}

/// Row offset of a 1-based task page
///
/// Rejects pages whose offset does not fit in an `i64`.
pub fn page_offset(page: i64, page_size: i64) -> RewardResult<i64> {
    if page < 1 {
        return Err(RewardError::validation("page must be at least 1"));
    }
    if !(1..=100).contains(&page_size) {
        return Err(RewardError::validation("page_size must be between 1 and 100"));
    }

    (page - 1)
        .checked_mul(page_size)
        .ok_or_else(|| RewardError::validation("page is out of range"))
}

impl Task {
    /// Creates a task in the "not started" state
    ///
    /// # Errors
    ///
    /// - `Validation` if the title is blank
    /// - `Validation` if the assignee does not exist (foreign key)
    pub async fn create(pool: &PgPool, data: CreateTask) -> RewardResult<Self> {
        let title = data.title.trim().to_string();
        if title.is_empty() {
            return Err(RewardError::validation("task title cannot be empty"));
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, due_date, assignee_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(data.description)
        .bind(TaskStatus::NotStarted)
        .bind(data.due_date)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await
        .map_err(map_assignee_violation)?;

        tracing::info!(task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> RewardResult<Option<Self>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Reads the stored status and locks the row until the transaction ends
    ///
    /// Concurrent callers block here, so each observes the status written
    /// by the previous committer.
    pub async fn lock_status<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> RewardResult<Option<TaskStatus>> {
        let status = sqlx::query_scalar::<_, TaskStatus>(
            "SELECT status FROM tasks WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(status)
    }

    /// Writes a new status and returns the updated row
    pub async fn write_status<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        status: TaskStatus,
    ) -> RewardResult<Self> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Applies field overrides atomically (status is not editable here)
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    /// - `Validation` for a blank title or unknown assignee
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> RewardResult<Self> {
        let mut tx = pool.begin().await?;

        let mut task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RewardError::not_found("task not found"))?;

        data.apply_to(&mut task)?;

        let updated = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                due_date = $4,
                assignee_id = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(task.assignee_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_assignee_violation)?;

        tx.commit().await?;

        tracing::info!(task_id = %id, "Task updated");
        Ok(updated)
    }

    /// Lists tasks matching the filter, newest first
    ///
    /// `page` is 1-based.
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        page: i64,
        page_size: i64,
    ) -> RewardResult<TaskPage> {
        let offset = page_offset(page, page_size)?;

        let where_clause = r#"
            WHERE ($1::TEXT IS NULL OR title ILIKE '%' || $1 || '%')
              AND ($2::TEXT IS NULL OR description ILIKE '%' || $2 || '%')
              AND ($3::SMALLINT IS NULL OR status = $3)
              AND ($4::UUID IS NULL OR assignee_id = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
              AND ($7::TIMESTAMPTZ IS NULL OR due_date >= $7)
              AND ($8::TIMESTAMPTZ IS NULL OR due_date <= $8)
        "#;

        let (total_items,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM tasks {where_clause}"))
                .bind(filter.title.as_deref())
                .bind(filter.description.as_deref())
                .bind(filter.status)
                .bind(filter.assignee_id)
                .bind(filter.created_after)
                .bind(filter.created_before)
                .bind(filter.due_after)
                .bind(filter.due_before)
                .fetch_one(pool)
                .await?;

        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks {where_clause} \
             ORDER BY created_at DESC LIMIT $9 OFFSET $10"
        ))
        .bind(filter.title.as_deref())
        .bind(filter.description.as_deref())
        .bind(filter.status)
        .bind(filter.assignee_id)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(filter.due_after)
        .bind(filter.due_before)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(TaskPage {
            tasks,
            page,
            page_size,
            total_pages: (total_items + page_size - 1) / page_size,
            total_items,
        })
    }

    /// Returns one page of the task's description
    pub async fn description_page(
        pool: &PgPool,
        id: Uuid,
        page: usize,
        page_size: usize,
    ) -> RewardResult<DescriptionPage> {
        let task = Task::find_by_id(pool, id)
            .await?
            .ok_or_else(|| RewardError::not_found("task not found"))?;

        paginate_description(&task.description, page, page_size)
    }

    /// Deletes a task; returns true if a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> RewardResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Foreign-key violations on `assignee_id` mean the user does not exist
fn map_assignee_violation(err: sqlx::Error) -> RewardError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_foreign_key_violation() {
            return RewardError::validation("assignee does not exist");
        }
    }
    RewardError::from(err)
}
