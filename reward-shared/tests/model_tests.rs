/// Integration tests for model CRUD
///
/// Require a running PostgreSQL; see `common/mod.rs`.

mod common;

use chrono::{Duration, Utc};
use reward_shared::error::RewardError;
use reward_shared::models::activity::{UserActivity, UserFullInfo};
use reward_shared::models::referral::{CreateReferralCode, ReferralCode};
use reward_shared::models::task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask};
use reward_shared::models::user::{CreateUser, UpdateUser, User, UserFilter};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_user_email_is_unique_case_insensitively() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool).await;

    let result = User::create(
        &pool,
        CreateUser {
            username: "copycat".to_string(),
            email: user.email.to_uppercase(),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(RewardError::AlreadyExists(_))));

    let found = User::find_by_email(&pool, &user.email.to_uppercase())
        .await
        .unwrap()
        .expect("Lookup should ignore case");
    assert_eq!(found.id, user.id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_user_update_overrides_profile_only() {
    let pool = common::setup_pool().await;
    let user = common::create_user_with_balance(&pool, 8.0).await;

    let updated = User::update(
        &pool,
        user.id,
        UpdateUser {
            bio: Some(Some("Collects badges".to_string())),
            time_zone: Some(Some("Europe/Berlin".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.bio.as_deref(), Some("Collects badges"));
    assert_eq!(updated.time_zone.as_deref(), Some("Europe/Berlin"));
    assert_eq!(updated.username, user.username);
    assert_eq!(updated.balance, 8.0);

    let missing = User::update(&pool, Uuid::new_v4(), UpdateUser::default()).await;
    assert!(matches!(missing, Err(RewardError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_user_list_and_delete() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool).await;

    let filter = UserFilter {
        username: Some(user.username.clone()),
        status: None,
    };
    let listed = User::list(&pool, &filter, 10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(User::count(&pool, &filter).await.unwrap(), 1);

    assert!(User::delete(&pool, user.id).await.unwrap());
    assert!(!User::delete(&pool, user.id).await.unwrap());
    assert!(User::find_by_id(&pool, user.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_task_crud_and_filter() {
    let pool = common::setup_pool().await;
    let assignee = common::create_user(&pool).await;

    let task = Task::create(
        &pool,
        CreateTask {
            title: format!("Filter me {}", Uuid::new_v4().simple()),
            description: "first\n\nsecond".to_string(),
            assignee_id: Some(assignee.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(task.status, TaskStatus::NotStarted);

    let filter = TaskFilter {
        assignee_id: Some(assignee.id),
        status: Some(TaskStatus::NotStarted),
        ..Default::default()
    };
    let page = Task::list(&pool, &filter, 1, 10).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.tasks[0].id, task.id);

    let updated = Task::update(
        &pool,
        task.id,
        UpdateTask {
            description: Some("only".to_string()),
            assignee_id: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.description, "only");
    assert!(updated.assignee_id.is_none());
    assert_eq!(updated.title, task.title);

    assert!(Task::delete(&pool, task.id).await.unwrap());
    let missing = Task::update(&pool, task.id, UpdateTask::default()).await;
    assert!(matches!(missing, Err(RewardError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_task_unknown_assignee() {
    let pool = common::setup_pool().await;

    let result = Task::create(
        &pool,
        CreateTask {
            title: "Orphan".to_string(),
            assignee_id: Some(Uuid::new_v4()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(RewardError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_task_description_pages() {
    let pool = common::setup_pool().await;
    let task = common::create_task(&pool, "one\n\ntwo\n\nthree").await;

    let page = Task::description_page(&pool, task.id, 2, 1).await.unwrap();
    assert_eq!(page.description, "two");
    assert_eq!(page.total_pages, 3);

    let past_end = Task::description_page(&pool, task.id, 4, 1).await;
    assert!(matches!(past_end, Err(RewardError::NotFound(_))));

    let empty = common::create_task(&pool, "").await;
    let result = Task::description_page(&pool, empty.id, 1, 10).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_referral_codes() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool).await;
    let code = format!("WELCOME-{}", Uuid::new_v4().simple());

    let referral = ReferralCode::create(
        &pool,
        CreateReferralCode {
            user_id: owner.id,
            code: code.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(referral.code, code);

    let duplicate = ReferralCode::create(
        &pool,
        CreateReferralCode {
            user_id: owner.id,
            code: code.clone(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(RewardError::AlreadyExists(_))));

    let orphan = ReferralCode::create(
        &pool,
        CreateReferralCode {
            user_id: Uuid::new_v4(),
            code: format!("ORPHAN-{}", Uuid::new_v4().simple()),
        },
    )
    .await;
    assert!(matches!(orphan, Err(RewardError::NotFound(_))));

    let renamed = format!("RENAMED-{}", Uuid::new_v4().simple());
    let updated = ReferralCode::update_code(&pool, referral.id, &renamed).await.unwrap();
    assert_eq!(updated.code, renamed);
    assert!(ReferralCode::find_by_code(&pool, &renamed).await.unwrap().is_some());

    let listed = ReferralCode::list_by_user(&pool, owner.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(ReferralCode::delete(&pool, referral.id).await.unwrap());
    assert!(ReferralCode::find_by_id(&pool, referral.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_task_list_rejects_unreachable_page() {
    let pool = common::setup_pool().await;

    let result = Task::list(&pool, &TaskFilter::default(), i64::MAX, 100).await;
    assert!(matches!(result, Err(RewardError::Validation(_))));

    let page = Task::list(&pool, &TaskFilter::default(), i64::MAX / 100, 100)
        .await
        .unwrap();
    assert!(page.tasks.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_visit_activity_windows() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool).await;
    let now = Utc::now();

    for days_ago in [1, 3, 10, 20, 45] {
        UserActivity::record_visit_at(&pool, user.id, now - Duration::days(days_ago))
            .await
            .unwrap();
    }

    let stats = UserActivity::stats(&pool, user.id, now).await.unwrap();
    assert_eq!(stats.visit_count, 5);
    assert_eq!(stats.weekly, 2);
    assert_eq!(stats.monthly, 4);
    assert_eq!(
        stats.last_visit.map(|t| t.timestamp()),
        Some((now - Duration::days(1)).timestamp())
    );

    let visits = UserActivity::list_by_user(&pool, user.id, 2).await.unwrap();
    assert_eq!(visits.len(), 2);
    assert!(visits[0].visited_at > visits[1].visited_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_full_info_counts_recorded_visits() {
    let pool = common::setup_pool().await;
    let user = common::create_user_with_balance(&pool, 15.0).await;

    let empty = UserFullInfo::load(&pool, user.id).await.unwrap();
    assert_eq!(empty.activity.visit_count, 0);
    assert!(empty.activity.last_visit.is_none());

    UserActivity::record_visit(&pool, user.id).await.unwrap();
    UserActivity::record_visit(&pool, user.id).await.unwrap();

    let info = UserFullInfo::load(&pool, user.id).await.unwrap();
    assert_eq!(info.user.id, user.id);
    assert_eq!(info.user.balance, 15.0);
    assert_eq!(info.activity.visit_count, 2);
    assert_eq!(info.activity.weekly, 2);
    assert_eq!(info.activity.monthly, 2);
    assert!(info.activity.last_visit.is_some());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_visits_for_unknown_user() {
    let pool = common::setup_pool().await;

    let result = UserActivity::record_visit(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));

    let result = UserFullInfo::load(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RewardError::NotFound(_))));
}
