//! Derived study-tracking tests: lesson progress, streak accounting, and the
//! user profile helpers.

use serde_json::{Value, json};

use ulpan::Clock;
use ulpan::auth::UserId;
use ulpan::constants::{LAST_STUDY_DATE_KEY, STREAK_KEY};
use ulpan::store::{DocPath, DocumentStore};

use crate::helpers::TestContext;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Seed the streak keys as if the last study happened `days_ago` days ago.
async fn seed_streak(ctx: &TestContext, days_ago: u64, streak: u64) {
    let date = ctx.clock.today_local() - chrono::Days::new(days_ago);
    ctx.session
        .set(LAST_STUDY_DATE_KEY, json!(date.format(DATE_FORMAT).to_string()))
        .await
        .unwrap();
    ctx.session.set(STREAK_KEY, json!(streak)).await.unwrap();
}

#[tokio::test]
async fn save_progress_updates_the_map_and_the_per_lesson_mirror() {
    let ctx = TestContext::signed_in("u1").await;

    ctx.session.save_progress("lesson-1", true).await.unwrap();

    let progress = ctx.session.progress().await;
    let record = progress.get("lesson-1").expect("lesson should be recorded");
    assert!(record.completed);
    assert!(record.completed_at.starts_with("2024-01-01"));

    // The blob is stored under the generic data namespace...
    let blob = ctx
        .store
        .read(&DocPath::user_data(&UserId::new("u1"), "progress"))
        .await
        .unwrap();
    assert!(blob.is_some());

    // ...and the mirror under the per-lesson path.
    let mirror = ctx
        .store
        .read(&DocPath::user_progress(&UserId::new("u1"), "lesson-1"))
        .await
        .unwrap()
        .expect("mirror should exist");
    assert_eq!(mirror.get("completed").unwrap(), true);
    assert!(mirror.get("completedAt").is_some());
}

#[tokio::test]
async fn save_progress_accumulates_lessons() {
    let ctx = TestContext::signed_in("u1").await;

    ctx.session.save_progress("aleph", true).await.unwrap();
    ctx.session.save_progress("bet", false).await.unwrap();

    let progress = ctx.session.progress().await;
    assert_eq!(progress.len(), 2);
    assert!(progress.get("aleph").unwrap().completed);
    assert!(!progress.get("bet").unwrap().completed);
}

#[tokio::test]
async fn save_progress_rejects_an_empty_lesson_id() {
    let ctx = TestContext::signed_in("u1").await;
    let err = ctx.session.save_progress("", true).await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn malformed_progress_degrades_to_empty() {
    let ctx = TestContext::new();
    ctx.session.set("progress", json!("not a map")).await.unwrap();

    assert!(ctx.session.progress().await.is_empty());
}

#[tokio::test]
async fn lesson_records_lists_the_mirror_documents() {
    let ctx = TestContext::signed_in("u1").await;
    ctx.session.save_progress("aleph", true).await.unwrap();

    let records = ctx.session.lesson_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records["aleph"]["completed"], json!(true));
}

#[tokio::test]
async fn lesson_records_is_empty_when_signed_out() {
    let ctx = TestContext::new();
    assert!(ctx.session.lesson_records().await.is_empty());
}

#[tokio::test]
async fn streak_increments_after_a_consecutive_day() {
    let ctx = TestContext::signed_in("u1").await;
    seed_streak(&ctx, 1, 3).await;

    ctx.session.update_streak().await.unwrap();

    assert_eq!(ctx.session.streak().await, 4);
    let today = ctx.clock.today_local().format(DATE_FORMAT).to_string();
    assert_eq!(
        ctx.session.get(LAST_STUDY_DATE_KEY, Value::Null).await,
        json!(today)
    );
}

#[tokio::test]
async fn streak_update_is_once_per_day() {
    let ctx = TestContext::signed_in("u1").await;
    seed_streak(&ctx, 1, 3).await;

    ctx.session.update_streak().await.unwrap();
    ctx.session.update_streak().await.unwrap();

    assert_eq!(ctx.session.streak().await, 4);
}

#[tokio::test]
async fn streak_resets_after_a_gap() {
    let ctx = TestContext::signed_in("u1").await;
    seed_streak(&ctx, 2, 5).await;

    ctx.session.update_streak().await.unwrap();

    assert_eq!(ctx.session.streak().await, 1);
}

#[tokio::test]
async fn first_study_starts_a_streak_of_one() {
    let ctx = TestContext::signed_in("u1").await;

    ctx.session.update_streak().await.unwrap();

    assert_eq!(ctx.session.streak().await, 1);
}

#[tokio::test]
async fn streak_spans_days_as_the_clock_advances() {
    let ctx = TestContext::signed_in("u1").await;

    ctx.session.update_streak().await.unwrap();
    ctx.clock.advance_days(1);
    ctx.session.update_streak().await.unwrap();
    ctx.clock.advance_days(1);
    ctx.session.update_streak().await.unwrap();

    assert_eq!(ctx.session.streak().await, 3);
}

#[tokio::test]
async fn streak_defaults_to_zero() {
    let ctx = TestContext::new();
    assert_eq!(ctx.session.streak().await, 0);
}

#[tokio::test]
async fn user_profile_round_trips() {
    let ctx = TestContext::signed_in("u1").await;
    let profile = json!({"displayName": "Rivka", "level": "beginner"});

    ctx.session.save_user_profile(profile.clone()).await.unwrap();

    assert_eq!(ctx.session.user_profile().await, profile);
    // Absent profile degrades to an empty object.
    let fresh = TestContext::new();
    assert_eq!(fresh.session.user_profile().await, json!({}));
}
