/// Referral code endpoints
///
/// - `GET    /v1/referrals?user_id=` - List a user's codes (defaults to the caller)
/// - `POST   /v1/referrals` - Create a code
/// - `GET    /v1/referrals/:id` - Get a code
/// - `PUT    /v1/referrals/:id` - Replace the code string
/// - `DELETE /v1/referrals/:id` - Delete a code

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthContext,
    routes::validate_request,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use reward_shared::models::referral::{CreateReferralCode, ReferralCode};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReferralRequest {
    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: String,

    /// Owner; defaults to the caller
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReferralRequest {
    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ListReferralsQuery {
    pub user_id: Option<Uuid>,
}

pub async fn list_referrals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListReferralsQuery>,
) -> ApiResult<Json<Vec<ReferralCode>>> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let referrals = ReferralCode::list_by_user(&state.db, user_id).await?;
    Ok(Json(referrals))
}

/// Creates a referral code
///
/// # Errors
///
/// - `404 Not Found`: owner does not exist
/// - `409 Conflict`: code already taken
/// - `422 Unprocessable Entity`: code empty, too long or contains whitespace
pub async fn create_referral(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateReferralRequest>,
) -> ApiResult<(StatusCode, Json<ReferralCode>)> {
    validate_request(&req)?;

    let referral = ReferralCode::create(
        &state.db,
        CreateReferralCode {
            user_id: req.user_id.unwrap_or(auth.user_id),
            code: req.code,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(referral)))
}

pub async fn get_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReferralCode>> {
    let referral = ReferralCode::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("referral code not found".to_string()))?;

    Ok(Json(referral))
}

pub async fn update_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReferralRequest>,
) -> ApiResult<Json<ReferralCode>> {
    validate_request(&req)?;

    let referral = ReferralCode::update_code(&state.db, id, &req.code).await?;
    Ok(Json(referral))
}

pub async fn delete_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !ReferralCode::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("referral code not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
