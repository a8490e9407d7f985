/// Authentication utilities
///
/// # Modules
///
/// - [`jwt`]: HS256 bearer token creation and validation
///
/// # Example
///
/// ```
/// use reward_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(Uuid::new_v4());
/// let token = create_token(&claims, "a-secret-that-is-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
