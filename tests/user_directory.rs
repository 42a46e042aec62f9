//! `ensure_user` registration and activity tracking against a real database.

mod helpers;

use botstore::data::users::{UserId, UserIdentifier, UserRecord, ensure_user, get_user};
use botstore::utils::now_millis;
use helpers::{count_users, setup};
use rust_decimal::Decimal;
use sqlx::PgPool;

fn id(raw: i64) -> UserId {
    UserId::new(raw).expect("non-zero id")
}

async fn load(pool: &PgPool, raw: i64) -> botstore::data::users::User {
    get_user(pool, id(raw))
        .await
        .unwrap()
        .expect("user should exist")
}

#[sqlx::test(migrations = false)]
async fn test_new_user_is_created_once(pool: PgPool) {
    setup(&pool).await;

    let before = now_millis();
    let result = ensure_user(&pool, &UserIdentifier::Id(1001), Some("alice"), false)
        .await
        .unwrap();
    let after = now_millis();

    assert_eq!(result, Some(id(1001)));
    assert_eq!(count_users(&pool).await, 1);

    let user = load(&pool, 1001).await;
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(user.registered_at, user.last_seen);
    assert!(user.registered_at >= before && user.registered_at <= after);
    assert_eq!(user.message_count, Some(0));
    assert_eq!(user.balance, Some(Decimal::ZERO));
    assert_eq!(user.verified, Some(false));
    assert_eq!(user.last_bonus_claim, Some(0));
}

#[sqlx::test(migrations = false)]
async fn test_new_user_without_name_gets_empty_username(pool: PgPool) {
    setup(&pool).await;
    ensure_user(&pool, &UserIdentifier::Id(1002), None, false).await.unwrap();
    assert_eq!(load(&pool, 1002).await.username.as_deref(), Some(""));
}

#[sqlx::test(migrations = false)]
async fn test_rename_updates_only_username_and_last_seen(pool: PgPool) {
    setup(&pool).await;
    ensure_user(&pool, &UserIdentifier::Id(1003), Some("alice"), false)
        .await
        .unwrap();

    // Simulate state owned by other subsystems and an older visit
    sqlx::query(
        "UPDATE users SET balance = 12.50, wallet = 'W-1', last_seen = registered_at - 1000 WHERE id = 1003",
    )
    .execute(&pool)
    .await
    .unwrap();
    let original = load(&pool, 1003).await;

    ensure_user(&pool, &UserIdentifier::Id(1003), Some("bob"), false)
        .await
        .unwrap();
    let updated = load(&pool, 1003).await;

    assert_eq!(updated.username.as_deref(), Some("bob"));
    assert!(updated.last_seen > original.last_seen);
    assert_eq!(updated.registered_at, original.registered_at);
    assert_eq!(updated.message_count, original.message_count);
    assert_eq!(updated.activity_score, original.activity_score);
    assert_eq!(updated.balance, Some(Decimal::new(1250, 2)));
    assert_eq!(updated.wallet.as_deref(), Some("W-1"));
    assert_eq!(count_users(&pool).await, 1);
}

#[sqlx::test(migrations = false)]
async fn test_missing_or_empty_name_keeps_username(pool: PgPool) {
    setup(&pool).await;
    ensure_user(&pool, &UserIdentifier::Id(1004), Some("alice"), false)
        .await
        .unwrap();

    ensure_user(&pool, &UserIdentifier::Id(1004), None, false).await.unwrap();
    assert_eq!(load(&pool, 1004).await.username.as_deref(), Some("alice"));

    ensure_user(&pool, &UserIdentifier::Id(1004), Some(""), false)
        .await
        .unwrap();
    assert_eq!(load(&pool, 1004).await.username.as_deref(), Some("alice"));
}

#[sqlx::test(migrations = false)]
async fn test_activity_tracking_increments_and_scores(pool: PgPool) {
    setup(&pool).await;
    ensure_user(&pool, &UserIdentifier::Id(1005), Some("alice"), true)
        .await
        .unwrap();
    // Creation does not count as a message
    assert_eq!(load(&pool, 1005).await.message_count, Some(0));

    let tolerance = Decimal::new(1, 2);

    ensure_user(&pool, &UserIdentifier::Id(1005), Some("alice"), true)
        .await
        .unwrap();
    let first = load(&pool, 1005).await;
    assert_eq!(first.message_count, Some(1));
    // Registered moments ago, so the 0.01 hour floor applies: 1 / 0.01
    let score = first.activity_score.expect("score should be set");
    assert!((score - Decimal::from(100)).abs() < tolerance, "score was {score}");

    ensure_user(&pool, &UserIdentifier::Id(1005), Some("alice"), true)
        .await
        .unwrap();
    let second = load(&pool, 1005).await;
    assert_eq!(second.message_count, Some(2));
    let score = second.activity_score.expect("score should be set");
    assert!((score - Decimal::from(200)).abs() < tolerance, "score was {score}");
}

#[sqlx::test(migrations = false)]
async fn test_activity_score_uses_registration_age(pool: PgPool) {
    setup(&pool).await;
    ensure_user(&pool, &UserIdentifier::Id(1006), None, false).await.unwrap();

    // Registered two hours ago with three messages so far
    sqlx::query(
        "UPDATE users SET registered_at = registered_at - 7200000, message_count = 3 WHERE id = 1006",
    )
    .execute(&pool)
    .await
    .unwrap();

    ensure_user(&pool, &UserIdentifier::Id(1006), None, true).await.unwrap();
    let user = load(&pool, 1006).await;
    assert_eq!(user.message_count, Some(4));
    let score = user.activity_score.expect("score should be set");
    assert!(
        (score - Decimal::from(2)).abs() < Decimal::new(1, 2),
        "score was {score}"
    );
}

#[sqlx::test(migrations = false)]
async fn test_record_with_uid_resolves(pool: PgPool) {
    setup(&pool).await;
    let ident = UserIdentifier::Record(UserRecord {
        id: None,
        uid: Some(2001),
    });

    let result = ensure_user(&pool, &ident, Some("carol"), false)
        .await
        .unwrap();

    assert_eq!(result, Some(id(2001)));
    assert_eq!(load(&pool, 2001).await.username.as_deref(), Some("carol"));
}

#[sqlx::test(migrations = false)]
async fn test_unusable_identifier_writes_nothing(pool: PgPool) {
    setup(&pool).await;

    let empty = UserIdentifier::Record(UserRecord::default());
    assert_eq!(ensure_user(&pool, &empty, Some("x"), true).await.unwrap(), None);
    assert_eq!(
        ensure_user(&pool, &UserIdentifier::Id(0), Some("x"), true)
            .await
            .unwrap(),
        None
    );

    assert_eq!(count_users(&pool).await, 0);
}

#[sqlx::test(migrations = false)]
async fn test_concurrent_first_contact_inserts_one_row(pool: PgPool) {
    setup(&pool).await;
    let ident = UserIdentifier::Id(3001);

    let (a, b) = tokio::join!(
        ensure_user(&pool, &ident, Some("dave"), false),
        ensure_user(&pool, &ident, Some("dave"), false),
    );

    assert_eq!(a.unwrap(), Some(id(3001)));
    assert_eq!(b.unwrap(), Some(id(3001)));
    assert_eq!(count_users(&pool).await, 1);
}

#[sqlx::test(migrations = false)]
async fn test_get_user_missing_is_none(pool: PgPool) {
    setup(&pool).await;
    assert!(get_user(&pool, id(404)).await.unwrap().is_none());
}
