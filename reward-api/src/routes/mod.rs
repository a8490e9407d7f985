/// API route handlers, one module per resource
///
/// - `health`: liveness and database status
/// - `tasks`: task CRUD, status transitions and description paging
/// - `users`: user CRUD, invites, balance, rank and leaderboard
/// - `referrals`: referral code CRUD

pub mod health;
pub mod referrals;
pub mod tasks;
pub mod users;

use crate::error::ApiError;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Runs `validator` rules on a request body
pub(crate) fn validate_request<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(ApiError::from_validation_errors)
}
