/// Coordinators for reward state changes
///
/// Each coordinator wraps a pool and runs one operation per transaction.
/// They are the only code that writes the reward counters or a task's
/// status after creation.
///
/// - [`Ledger`]: balance adjustments that never go below zero
/// - [`StatusTransitionCoordinator`]: status changes with at-most-once
///   completion credit
/// - [`ReferralInviteCoordinator`]: pending-user creation plus inviter credit
/// - [`RankingReader`]: rank and leaderboard reads by balance
///
/// A dropped future drops its open transaction, which rolls back; nothing
/// becomes visible before commit.

pub mod invite;
pub mod ledger;
pub mod ranking;
pub mod status;

pub use invite::{ReferralInviteCoordinator, DEFAULT_INVITE_BONUS};
pub use ledger::Ledger;
pub use ranking::{RankedUser, RankingReader};
pub use status::StatusTransitionCoordinator;
