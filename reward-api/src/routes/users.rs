/// User endpoints
///
/// - `GET    /v1/users` - List users
/// - `POST   /v1/users` - Create a user
/// - `GET    /v1/users/by-email?email=` - Look up by email
/// - `POST   /v1/users/invite` - Invite a new user, crediting the inviter
/// - `GET    /v1/users/leader` - Highest balance
/// - `GET    /v1/users/top?limit=&offset=` - Leaderboard page
/// - `GET    /v1/users/:id` - Get a user
/// - `PUT    /v1/users/:id` - Partially update profile fields
/// - `DELETE /v1/users/:id` - Delete a user
/// - `PUT    /v1/users/:id/balance?amount=` - Adjust balance by `amount`
/// - `GET    /v1/users/:id/summary` - Counters only
/// - `GET    /v1/users/:id/rank` - Rank by balance
/// - `POST   /v1/users/:id/visits` - Record a visit
/// - `GET    /v1/users/:id/full-info` - Profile, counters and visit activity

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
use reward_shared::coordination::RankedUser;
use reward_shared::models::activity::{UserActivity, UserFullInfo};
use reward_shared::models::user::{
    CreateUser, UpdateUser, User, UserFilter, UserStatus, UserSummary,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create user request
///
/// Email format is checked by the model, which answers 400 for a malformed
/// address.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: String,

    pub email: String,

    #[validate(length(max = 64, message = "Referral code must be at most 64 characters"))]
    pub referral_code: Option<String>,

    pub bio: Option<String>,

    #[validate(length(max = 64, message = "Time zone must be at most 64 characters"))]
    pub time_zone: Option<String>,

    pub status: Option<UserStatus>,
}

/// Update user request; absent fields are left unchanged, `null` clears
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: Option<String>,

    pub email: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub referral_code: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub time_zone: Option<Option<String>>,

    pub status: Option<UserStatus>,
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        UpdateUser {
            username: req.username,
            email: req.email,
            referral_code: req.referral_code,
            bio: req.bio,
            time_zone: req.time_zone,
            status: req.status,
        }
    }
}

/// Invite request
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,

    /// Inviting user; defaults to the caller
    pub inviter_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub inviter_id: Uuid,
    pub email: String,
    pub bonus: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub username: Option<String>,
    pub status: Option<UserStatus>,

    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUsersQuery {
    #[serde(default = "default_top_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Signed adjustment
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RankResponse {
    pub user_id: Uuid,
    pub rank: i64,
}

fn default_limit() -> i64 {
    20
}

fn default_top_limit() -> i64 {
    10
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<ListUsersResponse>> {
    if !(1..=100).contains(&query.limit) {
        return Err(ApiError::validation("limit", "limit must be between 1 and 100"));
    }
    if query.offset < 0 {
        return Err(ApiError::validation("offset", "offset cannot be negative"));
    }

    let filter = UserFilter {
        username: query.username,
        status: query.status,
    };

    let users = User::list(&state.db, &filter, query.limit, query.offset).await?;
    let total = User::count(&state.db, &filter).await?;

    Ok(Json(ListUsersResponse {
        users,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_request(&req)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            referral_code: req.referral_code,
            bio: req.bio,
            time_zone: req.time_zone,
            status: req.status.unwrap_or_default(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(user))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_email(&state.db, &query.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    validate_request(&req)?;

    let update = UpdateUser::from(req);
    if update.is_empty() {
        return Err(ApiError::validation("body", "no fields to update"));
    }

    let user = User::update(&state.db, id, update).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("user not found".to_string()));
    }

    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Invites a new user by email
///
/// Creates the invitee as a pending user and credits the inviter with the
/// configured bonus and one referral.
///
/// # Errors
///
/// - `400 Bad Request`: malformed email
/// - `404 Not Found`: inviter does not exist
/// - `409 Conflict`: a user with that email already exists
/// - `422 Unprocessable Entity`: inviter is still pending
pub async fn invite_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteResponse>)> {
    let inviter_id = req.inviter_id.unwrap_or(auth.user_id);

    state.invites.invite(inviter_id, &req.email).await?;

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            inviter_id,
            email: req.email.trim().to_lowercase(),
            bonus: state.invites.bonus(),
        }),
    ))
}

pub async fn adjust_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<BalanceResponse>> {
    let balance = state.ledger.adjust_balance(id, query.amount).await?;

    Ok(Json(BalanceResponse {
        user_id: id,
        balance,
    }))
}

pub async fn get_user_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserSummary>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(user.summary()))
}

pub async fn get_user_rank(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RankResponse>> {
    let rank = state.ranking.rank(id).await?;
    Ok(Json(RankResponse { user_id: id, rank }))
}

pub async fn record_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<UserActivity>)> {
    let visit = UserActivity::record_visit(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

pub async fn get_user_full_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserFullInfo>> {
    let info = UserFullInfo::load(&state.db, id).await?;
    Ok(Json(info))
}

pub async fn get_leader(State(state): State<AppState>) -> ApiResult<Json<RankedUser>> {
    let leader = state
        .ranking
        .leader()
        .await?
        .ok_or_else(|| ApiError::NotFound("no users yet".to_string()))?;

    Ok(Json(leader))
}

pub async fn get_top_users(
    State(state): State<AppState>,
    Query(query): Query<TopUsersQuery>,
) -> ApiResult<Json<Vec<RankedUser>>> {
    let users = state.ranking.top_users(query.limit, query.offset).await?;
    Ok(Json(users))
}
