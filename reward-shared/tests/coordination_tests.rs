/// Integration tests for the reward coordinators
///
/// Require a running PostgreSQL; see `common/mod.rs`.

mod common;

use futures::future::join_all;
use reward_shared::coordination::{
    Ledger, RankingReader, ReferralInviteCoordinator, StatusTransitionCoordinator,
    DEFAULT_INVITE_BONUS,
};
use reward_shared::error::RewardError;
use reward_shared::models::invite::Invite;
use reward_shared::models::task::{Task, TaskStatus};
use reward_shared::models::user::{User, UserStatus};
use uuid::Uuid;

// ---- Ledger ----

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_adjust_balance_credit_and_debit() {
    let pool = common::setup_pool().await;
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&pool).await;

    assert_eq!(ledger.adjust_balance(user.id, 30.0).await.unwrap(), 30.0);
    assert_eq!(ledger.adjust_balance(user.id, -12.5).await.unwrap(), 17.5);
    assert_eq!(ledger.adjust_balance(user.id, -17.5).await.unwrap(), 0.0);

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 0.0);
    assert!(stored.updated_at >= user.updated_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_adjust_balance_never_goes_negative() {
    let pool = common::setup_pool().await;
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user_with_balance(&pool, 5.0).await;

    let result = ledger.adjust_balance(user.id, -5.01).await;
    assert!(matches!(result, Err(RewardError::Validation(_))));

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 5.0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_adjust_balance_rejects_overflow() {
    let pool = common::setup_pool().await;
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&pool).await;

    assert_eq!(ledger.adjust_balance(user.id, f64::MAX).await.unwrap(), f64::MAX);

    let result = ledger.adjust_balance(user.id, f64::MAX).await;
    assert!(matches!(result, Err(RewardError::Validation(_))));

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, f64::MAX);
    assert!(stored.balance.is_finite());

    // Leave nothing at the top of the shared leaderboard
    assert_eq!(ledger.adjust_balance(user.id, -f64::MAX).await.unwrap(), 0.0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_adjust_balance_unknown_user() {
    let pool = common::setup_pool().await;
    let ledger = Ledger::new(pool);

    let result = ledger.adjust_balance(Uuid::new_v4(), 1.0).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_debits_respect_floor() {
    let pool = common::setup_pool().await;
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user_with_balance(&pool, 50.0).await;

    // Ten debits of 10 against 50: exactly five can succeed
    let results = join_all((0..10).map(|_| ledger.adjust_balance(user.id, -10.0))).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(RewardError::Validation(_))))
        .count();
    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 5);

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, 0.0);
}

// ---- Status transitions ----

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_complete_not_started_task_credits_once() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;
    let task = common::create_task(&pool, "").await;
    assert_eq!(task.status, TaskStatus::NotStarted);

    let updated = coordinator
        .transition_status(task.id, TaskStatus::Completed.code().into(), user.id)
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.tasks_completed, 1);

    // Completing again writes the status but credits nothing
    let again = coordinator.transition_status(task.id, 3, user.id).await.unwrap();
    assert_eq!(again.status, TaskStatus::Completed);
    assert!(again.updated_at >= updated.updated_at);

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.tasks_completed, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_reopen_and_complete_credits_again() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;
    let task = common::create_task(&pool, "").await;

    coordinator.transition_status(task.id, 3, user.id).await.unwrap();
    coordinator.transition_status(task.id, 2, user.id).await.unwrap();
    coordinator.transition_status(task.id, 3, user.id).await.unwrap();

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.tasks_completed, 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_non_completion_transitions_do_not_credit() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;
    let task = common::create_task(&pool, "").await;

    for status in [2, 4, 1, 2] {
        let updated = coordinator.transition_status(task.id, status, user.id).await.unwrap();
        assert_eq!(i32::from(updated.status.code()), status);
    }

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.tasks_completed, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_completion_credits_once() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;
    let task = common::create_task(&pool, "").await;

    let results = join_all((0..8).map(|_| coordinator.transition_status(task.id, 3, user.id))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let stored = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(stored.tasks_completed, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invalid_status_is_rejected() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;
    let task = common::create_task(&pool, "").await;

    for code in [0, 5, -1] {
        let result = coordinator.transition_status(task.id, code, user.id).await;
        assert!(matches!(result, Err(RewardError::Validation(_))));
    }

    let stored = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::NotStarted);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_transition_missing_task_or_user() {
    let pool = common::setup_pool().await;
    let coordinator = StatusTransitionCoordinator::new(pool.clone());
    let user = common::create_user(&pool).await;

    let result = coordinator.transition_status(Uuid::new_v4(), 2, user.id).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));

    // Completion credit for a missing user rolls the whole transition back
    let task = common::create_task(&pool, "").await;
    let result = coordinator.transition_status(task.id, 3, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RewardError::Validation(_))));

    let stored = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::NotStarted);
}

// ---- Invites ----

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invite_credits_inviter() {
    let pool = common::setup_pool().await;
    let coordinator = ReferralInviteCoordinator::new(pool.clone(), DEFAULT_INVITE_BONUS);
    let inviter = common::create_user_with_balance(&pool, 50.0).await;

    // Bring referrals to 2 with two earlier invites, then reset the balance to 50
    coordinator.invite(inviter.id, &common::unique_email("a")).await.unwrap();
    coordinator.invite(inviter.id, &common::unique_email("b")).await.unwrap();
    Ledger::new(pool.clone())
        .adjust_balance(inviter.id, -2.0 * DEFAULT_INVITE_BONUS)
        .await
        .unwrap();

    let before = User::find_by_id(&pool, inviter.id).await.unwrap().unwrap();
    assert_eq!(before.balance, 50.0);
    assert_eq!(before.referrals, 2);

    let email = common::unique_email("Friend");
    coordinator.invite(inviter.id, &email).await.unwrap();

    let after = User::find_by_id(&pool, inviter.id).await.unwrap().unwrap();
    assert_eq!(after.balance, 60.0);
    assert_eq!(after.referrals, 3);

    let invitee = User::find_by_email(&pool, &email).await.unwrap().unwrap();
    assert_eq!(invitee.status, UserStatus::Pending);
    assert_eq!(invitee.email, email.to_lowercase());
    assert_eq!(invitee.username, email.to_lowercase().split('@').next().unwrap());
    assert_eq!(invitee.balance, 0.0);

    let invites = Invite::list_by_inviter(&pool, inviter.id).await.unwrap();
    assert_eq!(invites.len(), 3);
    assert_eq!(invites[0].invitee_id, invitee.id);
    assert_eq!(invites[0].bonus, DEFAULT_INVITE_BONUS);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invite_existing_user_fails_without_credit() {
    let pool = common::setup_pool().await;
    let coordinator = ReferralInviteCoordinator::new(pool.clone(), DEFAULT_INVITE_BONUS);
    let inviter = common::create_user_with_balance(&pool, 50.0).await;
    let existing = common::create_user(&pool).await;

    let result = coordinator
        .invite(inviter.id, &existing.email.to_uppercase())
        .await;
    assert!(matches!(result, Err(RewardError::AlreadyExists(_))));

    let after = User::find_by_id(&pool, inviter.id).await.unwrap().unwrap();
    assert_eq!(after.balance, 50.0);
    assert_eq!(after.referrals, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_duplicate_invites_credit_once() {
    let pool = common::setup_pool().await;
    let coordinator = ReferralInviteCoordinator::new(pool.clone(), DEFAULT_INVITE_BONUS);
    let first = common::create_user(&pool).await;
    let second = common::create_user(&pool).await;
    let email = common::unique_email("contested");

    let inviters = [first.id, second.id, first.id, second.id];
    let results = join_all(inviters.iter().map(|id| coordinator.invite(*id, &email))).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(RewardError::AlreadyExists(_)))));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let first = User::find_by_id(&pool, first.id).await.unwrap().unwrap();
    let second = User::find_by_id(&pool, second.id).await.unwrap().unwrap();
    assert_eq!(first.referrals + second.referrals, 1);
    assert_eq!(first.balance + second.balance, DEFAULT_INVITE_BONUS);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invite_rejections() {
    let pool = common::setup_pool().await;
    let coordinator = ReferralInviteCoordinator::new(pool.clone(), DEFAULT_INVITE_BONUS);
    let inviter = common::create_user(&pool).await;

    let result = coordinator.invite(inviter.id, "not-an-email").await;
    assert!(matches!(result, Err(RewardError::BadRequest(_))));

    let result = coordinator
        .invite(Uuid::new_v4(), &common::unique_email("orphan"))
        .await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));

    // A pending invitee cannot invite others until activated
    let pending_email = common::unique_email("pending");
    coordinator.invite(inviter.id, &pending_email).await.unwrap();
    let pending = User::find_by_email(&pool, &pending_email).await.unwrap().unwrap();

    let result = coordinator
        .invite(pending.id, &common::unique_email("chain"))
        .await;
    assert!(matches!(result, Err(RewardError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invite_store_failure_leaves_no_trace() {
    let pool = common::setup_pool().await;
    let coordinator = ReferralInviteCoordinator::new(pool.clone(), DEFAULT_INVITE_BONUS);
    let inviter = common::create_user_with_balance(&pool, 50.0).await;

    // The referral increment overflows INTEGER after the invitee and the
    // invite row have been written.
    sqlx::query("UPDATE users SET referrals = 2147483647 WHERE id = $1")
        .bind(inviter.id)
        .execute(&pool)
        .await
        .unwrap();

    let email = common::unique_email("unlucky");
    let result = coordinator.invite(inviter.id, &email).await;
    assert!(matches!(result, Err(RewardError::Database(_))));

    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 0);

    let (invites,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM invites WHERE invitee_email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(invites, 0);

    let after = User::find_by_id(&pool, inviter.id).await.unwrap().unwrap();
    assert_eq!(after.balance, 50.0);
    assert_eq!(after.referrals, i32::MAX);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_invite_rejects_invalid_bonus() {
    let pool = common::setup_pool().await;
    let inviter = common::create_user_with_balance(&pool, 50.0).await;

    for bonus in [-5.0, f64::NAN, f64::INFINITY] {
        let coordinator = ReferralInviteCoordinator::new(pool.clone(), bonus);
        let email = common::unique_email("bonus");

        let result = coordinator.invite(inviter.id, &email).await;
        assert!(matches!(result, Err(RewardError::Validation(_))));
        assert!(User::find_by_email(&pool, &email).await.unwrap().is_none());
    }

    let after = User::find_by_id(&pool, inviter.id).await.unwrap().unwrap();
    assert_eq!(after.balance, 50.0);
    assert_eq!(after.referrals, 0);
}

// ---- Ranking ----

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_rank_orders_by_balance_with_ties() {
    let pool = common::setup_pool().await;
    let ranking = RankingReader::new(pool.clone());

    // Balances in an odd range so rows from other tests do not land between them
    let base = 7_340_000.0 + (Uuid::new_v4().as_u128() % 1000) as f64 * 4.0;
    let top = common::create_user_with_balance(&pool, base + 3.0).await;
    let tie_a = common::create_user_with_balance(&pool, base + 2.0).await;
    let tie_b = common::create_user_with_balance(&pool, base + 2.0).await;
    let low = common::create_user_with_balance(&pool, base + 1.0).await;

    let top_rank = ranking.rank(top.id).await.unwrap();
    assert!(top_rank >= 1);
    assert_eq!(ranking.rank(tie_a.id).await.unwrap(), top_rank + 1);
    assert_eq!(ranking.rank(tie_b.id).await.unwrap(), top_rank + 1);
    assert_eq!(ranking.rank(low.id).await.unwrap(), top_rank + 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_rank_unknown_user() {
    let pool = common::setup_pool().await;
    let ranking = RankingReader::new(pool);

    let result = ranking.rank(Uuid::new_v4()).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_leaderboard_agrees_with_rank() {
    let pool = common::setup_pool().await;
    let ranking = RankingReader::new(pool.clone());
    common::create_user_with_balance(&pool, 12.0).await;

    let page = ranking.top_users(5, 0).await.unwrap();
    assert!(!page.is_empty());
    assert_eq!(page[0].rank, 1);
    for pair in page.windows(2) {
        assert!(pair[0].balance >= pair[1].balance);
        if pair[0].balance == pair[1].balance {
            assert_eq!(pair[0].rank, pair[1].rank);
        } else {
            assert!(pair[1].rank > pair[0].rank);
        }
    }

    let leader = ranking.leader().await.unwrap().expect("Leaderboard is not empty");
    assert_eq!(leader.rank, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_top_users_rejects_bad_paging() {
    let pool = common::setup_pool().await;
    let ranking = RankingReader::new(pool);

    assert!(matches!(ranking.top_users(0, 0).await, Err(RewardError::Validation(_))));
    assert!(matches!(ranking.top_users(10, -1).await, Err(RewardError::Validation(_))));
}
