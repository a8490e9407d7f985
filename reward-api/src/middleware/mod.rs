/// Middleware for the API server
///
/// - `auth`: bearer JWT validation and the [`auth::AuthContext`] extension

pub mod auth;
