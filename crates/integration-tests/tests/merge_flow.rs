//! Integration tests for merge preview and execution.
//!
//! These tests require a running `PostgreSQL` database with migrations
//! applied (sl-cli migrate). Run with: cargo test -- --ignored

use chrono::{Duration, Utc};

use stagelink_core::{MergeType, UserId, UserRole};
use stagelink_identity::IdentityEngine;
use stagelink_identity::db::relations;
use stagelink_identity::models::MergeRequest;
use stagelink_identity::services::MergeError;

use stagelink_integration_tests::{
    seed_booking, seed_message, seed_notification, seed_talent_profile, seed_transaction,
    seed_user, test_pool, unique_email, user_exists,
};

fn request(primary_id: UserId, merged_id: UserId) -> MergeRequest {
    MergeRequest {
        primary_id,
        merged_id,
        reason: "integration test".to_owned(),
        merge_type: MergeType::AdminInitiated,
        performed_by: Some("itest".to_owned()),
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_preview_counts_bidirectional_relations() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let now = Utc::now();
    let primary = seed_user(
        &pool,
        &unique_email("preview-primary"),
        Some("Org A"),
        UserRole::Organizer,
        now - Duration::days(10),
    )
    .await;
    let merged = seed_user(
        &pool,
        &unique_email("preview-merged"),
        Some("Org B"),
        UserRole::Organizer,
        now,
    )
    .await;
    let counterparty = seed_user(
        &pool,
        &unique_email("preview-talent"),
        Some("T"),
        UserRole::Talent,
        now,
    )
    .await;

    // merged participates in bookings on both sides of the relation
    seed_booking(&pool, merged, counterparty).await;
    seed_booking(&pool, counterparty, merged).await;
    seed_message(&pool, merged, counterparty).await;

    let preview = engine
        .preview_account_merge(primary, merged)
        .await
        .expect("preview should succeed");

    assert_eq!(preview.data_to_merge.get("bookings"), 2);
    assert_eq!(preview.data_to_merge.get("messages"), 1);
    assert_eq!(preview.data_to_merge.get("payouts"), 0);
    assert_eq!(preview.primary.id, primary);
    assert_eq!(preview.merged.id, merged);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_preview_flags_conflicts_without_blocking() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let now = Utc::now();
    let primary = seed_user(
        &pool,
        &unique_email("conflict-primary"),
        Some("Alice"),
        UserRole::Talent,
        now,
    )
    .await;
    let merged = seed_user(
        &pool,
        &unique_email("conflict-merged"),
        Some("Alicia"),
        UserRole::Organizer,
        now,
    )
    .await;

    let preview = engine
        .preview_account_merge(primary, merged)
        .await
        .expect("preview should succeed despite conflicts");

    assert!(preview.conflicts.iter().any(|c| c.contains("Role mismatch")));
    assert!(preview.conflicts.iter().any(|c| c.contains("Name mismatch")));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_merge_moves_every_relation_and_deletes_duplicate() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let now = Utc::now();
    let primary = seed_user(
        &pool,
        &unique_email("merge-primary"),
        Some("Keeper"),
        UserRole::Talent,
        now - Duration::days(30),
    )
    .await;
    let merged = seed_user(
        &pool,
        &unique_email("merge-victim"),
        Some("Victim"),
        UserRole::Talent,
        now,
    )
    .await;
    let other = seed_user(
        &pool,
        &unique_email("merge-other"),
        None,
        UserRole::Organizer,
        now,
    )
    .await;

    seed_talent_profile(&pool, merged, Some("+254700000000"), &["dj", "mc"]).await;
    seed_booking(&pool, other, merged).await;
    seed_message(&pool, merged, other).await;
    seed_message(&pool, other, merged).await;
    seed_transaction(&pool, merged).await;
    seed_notification(&pool, merged).await;

    let before = relations::total_references(&pool, merged)
        .await
        .expect("count");
    assert_eq!(before, 5);

    engine
        .merge_accounts(&request(primary, merged))
        .await
        .expect("merge should succeed");

    // No relation row references the victim anymore, anywhere.
    let after = relations::total_references(&pool, merged)
        .await
        .expect("count");
    assert_eq!(after, 0);

    // The victim's rows now belong to the primary.
    let primary_refs = relations::total_references(&pool, primary)
        .await
        .expect("count");
    assert_eq!(primary_refs, 5);

    // The victim account is gone; its profile moved to the primary.
    assert!(!user_exists(&pool, merged).await);
    let profile_owner: Option<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM talent_profiles WHERE user_id = $1",
    )
    .bind(primary)
    .fetch_optional(&pool)
    .await
    .expect("profile query");
    assert_eq!(profile_owner, Some(primary));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_merge_into_self_is_rejected() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let user = seed_user(
        &pool,
        &unique_email("self-merge"),
        None,
        UserRole::Talent,
        Utc::now(),
    )
    .await;

    let result = engine.merge_accounts(&request(user, user)).await;
    assert!(matches!(result, Err(MergeError::SelfMerge)));
    assert!(user_exists(&pool, user).await);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_merge_with_missing_primary_leaves_victim_untouched() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let ghost = UserId::generate();
    let victim = seed_user(
        &pool,
        &unique_email("orphan-victim"),
        None,
        UserRole::Talent,
        Utc::now(),
    )
    .await;
    seed_transaction(&pool, victim).await;

    let result = engine.merge_accounts(&request(ghost, victim)).await;
    assert!(matches!(result, Err(MergeError::NotFound(id)) if id == ghost));

    assert!(user_exists(&pool, victim).await);
    let refs = relations::total_references(&pool, victim)
        .await
        .expect("count");
    assert_eq!(refs, 1);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_repeated_merge_fails_with_not_found() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let now = Utc::now();
    let primary = seed_user(
        &pool,
        &unique_email("repeat-primary"),
        None,
        UserRole::Talent,
        now - Duration::days(1),
    )
    .await;
    let merged = seed_user(
        &pool,
        &unique_email("repeat-victim"),
        None,
        UserRole::Talent,
        now,
    )
    .await;

    engine
        .merge_accounts(&request(primary, merged))
        .await
        .expect("first merge succeeds");

    let second = engine.merge_accounts(&request(primary, merged)).await;
    assert!(matches!(second, Err(MergeError::NotFound(id)) if id == merged));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_merge_resolves_detection_log_and_writes_record() {
    let pool = test_pool().await;
    let engine = IdentityEngine::new(pool.clone(), true);

    let now = Utc::now();
    let email_a = unique_email("audit-a");
    let email_b = unique_email("audit-b");
    let primary = seed_user(&pool, &email_a, None, UserRole::Talent, now - Duration::days(2)).await;
    let merged = seed_user(&pool, &email_b, None, UserRole::Talent, now).await;

    // A prior scan evaluation involving the pair.
    sqlx::query(
        r"
        INSERT INTO detection_log
            (normalized_email, detection_type, candidate_user_id,
             matched_user_id, similarity_score, reason)
        VALUES ($1, 'EXISTING_SCAN', $2, $3, 0.93, 'Similar email (93% match)')
        ",
    )
    .bind(email_b.to_lowercase())
    .bind(merged)
    .bind(primary)
    .execute(&pool)
    .await
    .expect("seed detection log");

    engine
        .merge_accounts(&request(primary, merged))
        .await
        .expect("merge succeeds");

    let (resolved, action): (bool, Option<String>) = sqlx::query_as(
        r"
        SELECT resolved, resolution_action
        FROM detection_log
        WHERE candidate_user_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        ",
    )
    .bind(merged)
    .fetch_one(&pool)
    .await
    .expect("detection log row");
    assert!(resolved);
    assert_eq!(action.as_deref(), Some("MERGED"));

    let records: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM merge_records WHERE primary_user_id = $1 AND merged_user_id = $2",
    )
    .bind(primary)
    .bind(merged)
    .fetch_one(&pool)
    .await
    .expect("merge record count");
    assert_eq!(records, 1);
}
