/// Task endpoints
///
/// - `GET    /v1/tasks` - List tasks (filters + pagination)
/// - `POST   /v1/tasks` - Create a task
/// - `GET    /v1/tasks/:id` - Get a task
/// - `PUT    /v1/tasks/:id` - Partially update a task (not its status)
/// - `DELETE /v1/tasks/:id` - Delete a task
/// - `PATCH  /v1/tasks/:id/status` - Change status, crediting completion
/// - `GET    /v1/tasks/:id/description` - One page of the description
///
/// Status values on the wire: 1 not started, 2 in progress, 3 completed,
/// 4 canceled.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthContext,
    routes::{double_option, validate_request},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use reward_shared::models::task::{
    CreateTask, DescriptionPage, Task, TaskFilter, TaskPage, TaskStatus, UpdateTask,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// Update task request; absent fields are left unchanged, `null` clears
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        }
    }
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct TransitionStatusRequest {
    /// Wire value 1-4
    pub status: i32,

    /// User credited on completion; defaults to the caller
    pub user_id: Option<Uuid>,
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,

    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<i32>,
    pub assignee_id: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
    pub due_before: Option<DateTime<Utc>>,
}

/// Query parameters for description paging
#[derive(Debug, Deserialize)]
pub struct DescriptionQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

/// Parses a wire status, rejecting unknown values with 422
fn parse_status(code: i32) -> ApiResult<TaskStatus> {
    TaskStatus::from_code(code).ok_or_else(|| ApiError::validation("status", "status does not exist"))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<TaskPage>> {
    let filter = TaskFilter {
        title: query.title,
        description: query.description,
        status: query.status.map(parse_status).transpose()?,
        assignee_id: query.assignee_id,
        created_after: query.created_after,
        created_before: query.created_before,
        due_after: query.due_after,
        due_before: query.due_before,
    };

    let page = Task::list(&state.db, &filter, query.page, query.page_size).await?;
    Ok(Json(page))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    validate_request(&req)?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created via API");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    validate_request(&req)?;

    let task = Task::update(&state.db, id, req.into()).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("task not found".to_string()));
    }

    tracing::info!(task_id = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Changes a task's status
///
/// Entering "completed" from any other status credits `user_id` (or the
/// caller) with one completed task, at most once per completion.
///
/// # Errors
///
/// - `404 Not Found`: task does not exist
/// - `422 Unprocessable Entity`: unknown status, or the credited user does not exist
pub async fn transition_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionStatusRequest>,
) -> ApiResult<Json<Task>> {
    let acting_user_id = req.user_id.unwrap_or(auth.user_id);

    let task = state
        .status
        .transition_status(id, req.status, acting_user_id)
        .await?;

    Ok(Json(task))
}

pub async fn get_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DescriptionQuery>,
) -> ApiResult<Json<DescriptionPage>> {
    // Values below 1 fall back to the defaults inside the pager
    let page = query.page.unwrap_or(1).max(0) as usize;
    let page_size = query.page_size.unwrap_or(10).max(0) as usize;

    let description = Task::description_page(&state.db, id, page, page_size).await?;
    Ok(Json(description))
}
