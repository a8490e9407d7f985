//! Error taxonomy shared by the models and the coordination layer
//!
//! Every fallible operation in this crate returns [`RewardError`]. The HTTP
//! layer maps each variant to a status code; the variants themselves carry
//! only a human-readable message (or the underlying store error).
//!
//! # Variants
//!
//! - `NotFound`: a referenced entity does not exist
//! - `BadRequest`: malformed input (e.g. an email that does not parse)
//! - `Validation`: well-formed input that breaks a business rule
//! - `AlreadyExists`: a uniqueness rule would be violated
//! - `Database`: store or transport failure, surfaced as-is and never retried

/// Result alias used across the crate
pub type RewardResult<T> = Result<T, RewardError>;

/// Unique constraints whose violation means "already exists" rather than
/// an internal failure.
const UNIQUE_CONSTRAINTS: &[&str] = &[
    "users_email_key",
    "invites_invitee_email_key",
    "referral_codes_code_key",
];

/// Error type for reward operations
#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    /// Referenced entity is absent
    #[error("{0}")]
    NotFound(String),

    /// Malformed input
    #[error("{0}")]
    BadRequest(String),

    /// Business-rule violation
    #[error("{0}")]
    Validation(String),

    /// Duplicate email, invitee or referral code
    #[error("{0}")]
    AlreadyExists(String),

    /// Store failure
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl RewardError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        RewardError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        RewardError::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        RewardError::Validation(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        RewardError::AlreadyExists(msg.into())
    }

    /// True for store failures (the "internal" class)
    pub fn is_internal(&self) -> bool {
        matches!(self, RewardError::Database(_))
    }
}

/// Unique-violation errors on the known constraints become `AlreadyExists`;
/// everything else stays a store failure.
impl From<sqlx::Error> for RewardError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(constraint) = db_err.constraint() {
                if UNIQUE_CONSTRAINTS.contains(&constraint) {
                    return RewardError::AlreadyExists(match constraint {
                        "referral_codes_code_key" => "referral code already exists".to_string(),
                        _ => "user already exists".to_string(),
                    });
                }
            }
        }

        RewardError::Database(err)
    }
}
