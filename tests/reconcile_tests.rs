// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook event reconciliation against the in-memory store.

use challenge_leaderboard::config::Config;
use challenge_leaderboard::db::DocumentStore;
use challenge_leaderboard::error::AppError;
use challenge_leaderboard::models::{TeamStats, TeamWeekStats, WebhookEvent};
use challenge_leaderboard::services::leaderboard::{load_overall, load_weekly};
use challenge_leaderboard::services::{ReconcileOutcome, SkipReason};
use chrono::Utc;
use std::time::Duration;

mod common;
use common::{
    activity_event, athlete, create_flaky_test_app, create_test_app, create_test_app_with,
    deauthorization_event, detail, visibility_event,
};

/// Week 1 id for the test calendar.
const WEEK_1: &str = "2025-11-03";

fn without_timestamps(mut stats: TeamStats) -> TeamStats {
    stats.updated_at.clear();
    stats
}

#[tokio::test]
async fn test_create_applies_to_overall_and_week() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source
        .put_detail(detail(100, 1, "Run", 1, 30, 5000.0, Some(300.0)));

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            activity_id: 100,
            team_id: "red".to_string(),
            week: 1,
        }
    );

    let stored = app.store.get_activity(100).await.unwrap().unwrap();
    assert_eq!(stored.team_id, "red");
    assert_eq!(stored.source, "webhook");

    let overall = load_overall(app.store.as_ref(), &app.state.roster, Utc::now())
        .await
        .unwrap();
    let red = &overall.teams[0];
    assert_eq!(red.team_id, "red");
    assert_eq!(red.total_activities, 1);
    assert_eq!(red.total_hours, 0.5);
    assert_eq!(red.total_points, 9.5);
    assert_eq!(red.top_members[0].name, "Test Athlete1");
    assert_eq!(red.top_members[0].last_activity_type.as_deref(), Some("Run"));

    let weeks = load_weekly(
        app.store.as_ref(),
        &app.state.roster,
        &app.state.config.calendar,
        Utc::now(),
    )
    .await
    .unwrap();
    let week1 = &weeks[0];
    assert_eq!(week1.week_id, WEEK_1);
    let ranking: Vec<(&str, u32)> = week1
        .teams
        .iter()
        .map(|t| (t.team_id.as_str(), t.points))
        .collect();
    assert_eq!(ranking, vec![("red", 50), ("blue", 40), ("green", 30)]);
    assert_eq!(week1.teams[0].hours, 0.5);
    assert_eq!(week1.teams[0].activities, 1);
}

#[tokio::test]
async fn test_create_for_unknown_athlete_is_noop() {
    let app = create_test_app();
    app.source.put_detail(detail(100, 9, "Run", 1, 30, 5000.0, None));

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 9))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::UnknownAthlete));
    assert_eq!(app.source.fetches(), 0);
    assert_eq!(app.store.activity_count().await, 0);
    assert!(app.store.list_team_stats().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_for_unaffiliated_athlete_is_noop() {
    let app = create_test_app();
    let mut loner = athlete(2, Some("purple"));
    loner.strava_club_id = Some(999);
    app.seed_athletes(&[loner]).await;
    app.source.put_detail(detail(100, 2, "Run", 1, 30, 5000.0, None));

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 2))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Unaffiliated));
    assert_eq!(app.store.activity_count().await, 0);
}

#[tokio::test]
async fn test_athlete_resolved_by_club() {
    let app = create_test_app();
    let mut member = athlete(3, None);
    member.strava_club_id = Some(102);
    app.seed_athletes(&[member]).await;
    app.source.put_detail(detail(100, 3, "Walk", 2, 40, 3000.0, None));

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 3))
        .await
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Applied { ref team_id, .. } if team_id == "blue"));
}

#[tokio::test]
async fn test_create_before_challenge_start_is_noop() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", -2, 60, 10000.0, None));

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Skipped(SkipReason::BeforeChallengeStart)
    );
    assert_eq!(app.store.activity_count().await, 0);
    assert!(app.store.get_team_stats("red").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_create_does_not_double_count() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));

    let event = activity_event("create", 100, 1);
    app.state.reconciler.handle_event(&event).await.unwrap();
    let second = app.state.reconciler.handle_event(&event).await.unwrap();

    assert_eq!(
        second,
        ReconcileOutcome::Recomputed {
            activity_id: 100,
            team_id: "red".to_string(),
        }
    );
    let red = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(red.total_activities, 1);
    assert_eq!(red.total_moving_time, 30 * 60);
    let week = app.store.get_team_week(WEEK_1, "red").await.unwrap().unwrap();
    assert_eq!(week.activities, 1);
}

#[tokio::test]
async fn test_stored_activity_keeps_its_team() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));
    let event = activity_event("create", 100, 1);
    app.state.reconciler.handle_event(&event).await.unwrap();

    // Athlete switches teams; the stored activity stays with red
    app.seed_athletes(&[athlete(1, Some("blue"))]).await;
    app.state.reconciler.handle_event(&event).await.unwrap();

    let stored = app.store.get_activity(100).await.unwrap().unwrap();
    assert_eq!(stored.team_id, "red");
    assert!(app.store.get_team_stats("blue").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_then_delete_restores_team_aggregate() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red")), athlete(2, Some("red"))])
        .await;
    // Delivered out of chronological order, with distances whose float
    // sums depend on addition order
    app.source.put_detail(detail(100, 1, "Run", 1, 20, 1100.0, Some(110.0)));
    app.source.put_detail(detail(102, 1, "Hike", 3, 40, 3300.0, Some(330.0)));
    app.source.put_detail(detail(101, 1, "Ride", 2, 30, 2200.0, Some(220.0)));
    for id in [100, 102, 101] {
        app.state
            .reconciler
            .handle_event(&activity_event("create", id, 1))
            .await
            .unwrap();
    }
    let before = app.store.get_team_stats("red").await.unwrap().unwrap();
    let week_before = app.store.get_team_week(WEEK_1, "red").await.unwrap().unwrap();

    app.source.put_detail(detail(103, 1, "Walk", 2, 25, 1700.0, Some(90.0)));
    app.source.put_detail(detail(104, 2, "Ride", 1, 60, 20000.0, Some(400.0)));
    for (id, owner) in [(103, 1), (104, 2)] {
        app.state
            .reconciler
            .handle_event(&activity_event("create", id, owner))
            .await
            .unwrap();
    }

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("delete", 104, 2))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Deleted {
            activity_id: 104,
            team_id: "red".to_string(),
        }
    );
    app.state
        .reconciler
        .handle_event(&activity_event("delete", 103, 1))
        .await
        .unwrap();

    let after = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(without_timestamps(after), without_timestamps(before));

    let week_after = app.store.get_team_week(WEEK_1, "red").await.unwrap().unwrap();
    assert_eq!(week_after.activities, week_before.activities);
    assert_eq!(week_after.moving_time, week_before.moving_time);
}

#[tokio::test]
async fn test_redelivered_create_repairs_failed_week_write() {
    let (app, flaky) = create_flaky_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, Some(300.0)));

    flaky.fail_week_writes(true);
    let err = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    // Overall slice written, weekly slice not
    assert!(app.store.get_activity(100).await.unwrap().is_some());
    assert!(app.store.get_team_week(WEEK_1, "red").await.unwrap().is_none());

    flaky.fail_week_writes(false);
    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Recomputed {
            activity_id: 100,
            team_id: "red".to_string(),
        }
    );

    let stats = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(stats.total_activities, 1);
    assert_eq!(stats.top_points(10), 9.5);
    let week = app.store.get_team_week(WEEK_1, "red").await.unwrap().unwrap();
    assert_eq!(week.activities, 1);
    assert_eq!(week.moving_time, 30 * 60);
}

#[tokio::test]
async fn test_delete_before_create_is_noop() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("delete", 100, 1))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::UnknownActivity));
    assert!(app.store.list_team_stats().await.unwrap().is_empty());
    assert!(app.store.list_team_weeks(WEEK_1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_recomputes_daily_cap() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    // Two 100-minute workouts on the same day: 200 min capped at 180
    app.source.put_detail(detail(100, 1, "Workout", 2, 100, 0.0, None));
    let mut second = detail(101, 1, "Workout", 2, 100, 0.0, None);
    second.start_date += chrono::Duration::hours(4);
    app.source.put_detail(second);

    for id in [100, 101] {
        app.state
            .reconciler
            .handle_event(&activity_event("create", id, 1))
            .await
            .unwrap();
    }
    let red = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(red.top_points(10), 18.0);

    app.state
        .reconciler
        .handle_event(&activity_event("delete", 101, 1))
        .await
        .unwrap();
    let red = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(red.top_points(10), 10.0);
    assert_eq!(red.total_activities, 1);
}

#[tokio::test]
async fn test_visibility_changes_delete_and_restore() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));
    app.state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap();

    let hidden = app
        .state
        .reconciler
        .handle_event(&visibility_event(100, 1, true))
        .await
        .unwrap();
    assert!(matches!(hidden, ReconcileOutcome::Deleted { .. }));
    assert!(app.store.get_activity(100).await.unwrap().is_none());
    assert_eq!(
        app.store
            .get_team_stats("red")
            .await
            .unwrap()
            .unwrap()
            .total_activities,
        0
    );

    let shown = app
        .state
        .reconciler
        .handle_event(&visibility_event(100, 1, false))
        .await
        .unwrap();
    assert!(matches!(shown, ReconcileOutcome::Applied { .. }));
    assert!(app.store.get_activity(100).await.unwrap().is_some());
}

#[tokio::test]
async fn test_title_update_is_ignored() {
    let app = create_test_app();
    let event: WebhookEvent = serde_json::from_value(serde_json::json!({
        "object_type": "activity",
        "object_id": 100,
        "aspect_type": "update",
        "owner_id": 1,
        "updates": { "title": "Morning Run" },
    }))
    .unwrap();

    let outcome = app.state.reconciler.handle_event(&event).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::UnhandledEvent));
}

#[tokio::test]
async fn test_deauthorization_keeps_historical_credit() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));
    app.state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap();
    let before = app.store.get_team_stats("red").await.unwrap().unwrap();

    let outcome = app
        .state
        .reconciler
        .handle_event(&deauthorization_event(1))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::AthleteRemoved { athlete_id: 1 });
    assert!(app.store.get_athlete(1).await.unwrap().is_none());
    assert!(app.store.get_activity(100).await.unwrap().is_some());
    assert_eq!(app.source.forgotten(), vec![1]);
    assert_eq!(app.store.get_team_stats("red").await.unwrap().unwrap(), before);

    // A later recompute keeps the athlete's name from the previous slice
    app.seed_athletes(&[athlete(2, Some("red"))]).await;
    app.source.put_detail(detail(102, 2, "Run", 2, 30, 5000.0, None));
    app.state
        .reconciler
        .handle_event(&activity_event("create", 102, 2))
        .await
        .unwrap();
    app.state
        .reconciler
        .handle_event(&activity_event("delete", 102, 2))
        .await
        .unwrap();
    let red = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(red.athletes["1"].name, "Test Athlete1");
    assert_eq!(red.total_activities, 1);
}

#[tokio::test]
async fn test_upstream_failure_is_retryable_and_writes_nothing() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));
    app.source.fail_fetch(AppError::STRAVA_RATE_LIMIT);

    let err = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(app.store.activity_count().await, 0);
    assert!(app.store.list_team_stats().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_timeout_is_retryable() {
    let mut config = Config::test_default();
    config.strava_timeout = Duration::from_millis(20);
    let app = create_test_app_with(config);
    app.seed_athletes(&[athlete(1, Some("red"))]).await;
    app.source.put_detail(detail(100, 1, "Run", 1, 30, 5000.0, None));
    app.source.delay_fetch(Duration::from_millis(500));

    let err = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 100, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Timeout(_)));
    assert!(err.is_retryable());
    assert_eq!(app.store.activity_count().await, 0);
}

#[tokio::test]
async fn test_activity_gone_upstream_is_noop() {
    let app = create_test_app();
    app.seed_athletes(&[athlete(1, Some("red"))]).await;

    let outcome = app
        .state
        .reconciler
        .handle_event(&activity_event("create", 404, 1))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::UnknownActivity));
}

#[tokio::test]
async fn test_concurrent_creates_for_same_team_are_not_lost() {
    let app = create_test_app();
    let athletes: Vec<_> = (1..=4).map(|id| athlete(id, Some("red"))).collect();
    app.seed_athletes(&athletes).await;
    app.source.delay_fetch(Duration::from_millis(5));

    let mut handles = Vec::new();
    for id in 0..20u64 {
        let owner = id % 4 + 1;
        app.source
            .put_detail(detail(1000 + id, owner, "Workout", (id % 3) as i64, 20, 0.0, None));
        let reconciler = app.state.reconciler.clone();
        handles.push(tokio::spawn(async move {
            reconciler
                .handle_event(&activity_event("create", 1000 + id, owner))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let red = app.store.get_team_stats("red").await.unwrap().unwrap();
    assert_eq!(red.total_activities, 20);
    assert_eq!(red.total_moving_time, 20 * 20 * 60);
    let athlete_total: u32 = red.athletes.values().map(|a| a.activities).sum();
    assert_eq!(athlete_total, 20);

    let week: TeamWeekStats = app.store.get_team_week(WEEK_1, "red").await.unwrap().unwrap();
    assert_eq!(week.activities, 20);
}
