/// Database models for the reward backend
///
/// Each model owns its table's CRUD. Reward counters (`balance`,
/// `referrals`, `tasks_completed`) and task status changes are not written
/// here; see [`crate::coordination`].
///
/// # Models
///
/// - `user`: users, their counters and profile fields
/// - `task`: tasks and description paging
/// - `referral`: user-owned referral codes
/// - `invite`: audit rows for successful invites
/// - `activity`: visit log and activity windows
///
/// # Example
///
/// ```no_run
/// use reward_shared::models::task::{Task, CreateTask};
/// use reward_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     title: "Write the onboarding guide".to_string(),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod invite;
pub mod referral;
pub mod task;
pub mod user;
