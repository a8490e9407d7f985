/// Database layer
///
/// - `pool`: connection pool creation, health check and stats
/// - `migrations`: embedded schema migrations
///
/// Table-level operations live in [`crate::models`].

pub mod migrations;
pub mod pool;
