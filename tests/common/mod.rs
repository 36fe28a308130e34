// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use challenge_leaderboard::config::Config;
use challenge_leaderboard::db::{DocumentStore, FirestoreDb, MemoryStore};
use challenge_leaderboard::error::AppError;
use challenge_leaderboard::models::{
    Activity, ActivityDetail, Athlete, Team, TeamStats, TeamWeekStats, WebhookEvent,
};
use challenge_leaderboard::routes::create_router;
use challenge_leaderboard::services::{ActivitySource, TeamPull};
use challenge_leaderboard::AppState;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fixtures ────────────────────────────────────────────────

/// Challenge start used by `Config::test_default()`.
#[allow(dead_code)]
pub fn challenge_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap()
}

/// Athlete on a configured team (by stored team id).
#[allow(dead_code)]
pub fn athlete(athlete_id: u64, team_id: Option<&str>) -> Athlete {
    Athlete {
        athlete_id,
        firstname: "Test".to_string(),
        lastname: format!("Athlete{}", athlete_id),
        profile: None,
        team_id: team_id.map(str::to_string),
        strava_club_id: None,
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: (Utc::now() + Duration::hours(6)).timestamp(),
        created_at: String::new(),
        updated_at: String::new(),
    }
}

/// Activity detail starting `day` days after challenge start at 07:00 UTC.
#[allow(dead_code)]
pub fn detail(
    activity_id: u64,
    athlete_id: u64,
    sport_type: &str,
    day: i64,
    minutes: i64,
    meters: f64,
    calories: Option<f64>,
) -> ActivityDetail {
    ActivityDetail {
        activity_id,
        athlete_id,
        sport_type: sport_type.to_string(),
        start_date: challenge_start() + Duration::days(day) + Duration::hours(7),
        utc_offset_secs: 0,
        moving_time: minutes * 60,
        distance: meters,
        calories,
        name: format!("Activity {}", activity_id),
    }
}

#[allow(dead_code)]
pub fn activity_event(aspect: &str, activity_id: u64, owner_id: u64) -> WebhookEvent {
    serde_json::from_value(serde_json::json!({
        "object_type": "activity",
        "object_id": activity_id,
        "aspect_type": aspect,
        "owner_id": owner_id,
        "event_time": 1762239600,
        "subscription_id": 1,
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn visibility_event(activity_id: u64, owner_id: u64, private: bool) -> WebhookEvent {
    serde_json::from_value(serde_json::json!({
        "object_type": "activity",
        "object_id": activity_id,
        "aspect_type": "update",
        "owner_id": owner_id,
        "updates": { "private": private.to_string() },
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn deauthorization_event(athlete_id: u64) -> WebhookEvent {
    serde_json::from_value(serde_json::json!({
        "object_type": "athlete",
        "object_id": athlete_id,
        "aspect_type": "update",
        "owner_id": athlete_id,
        "updates": { "authorized": "false" },
    }))
    .unwrap()
}

// ─── Fake Activity Source ────────────────────────────────────

/// Scripted provider: activity details, per-team pulls and member counts.
#[derive(Default)]
pub struct FakeSource {
    details: Mutex<HashMap<u64, ActivityDetail>>,
    team_activities: Mutex<HashMap<String, Vec<ActivityDetail>>>,
    team_athletes: Mutex<HashMap<String, Vec<u64>>>,
    member_counts: Mutex<HashMap<String, u32>>,
    failing_teams: Mutex<HashSet<String>>,
    fetch_failure: Mutex<Option<String>>,
    fetch_delay: Mutex<Option<std::time::Duration>>,
    list_delay: Mutex<Option<std::time::Duration>>,
    forgotten: Mutex<Vec<u64>>,
    pub fetch_calls: AtomicU32,
    pub list_calls: AtomicU32,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn put_detail(&self, detail: ActivityDetail) {
        self.details
            .lock()
            .unwrap()
            .insert(detail.activity_id, detail);
    }

    pub fn remove_detail(&self, activity_id: u64) {
        self.details.lock().unwrap().remove(&activity_id);
    }

    pub fn set_team_activities(&self, team_id: &str, activities: Vec<ActivityDetail>) {
        self.team_activities
            .lock()
            .unwrap()
            .insert(team_id.to_string(), activities);
    }

    /// Athletes listed in a team's pull. Defaults to the owners of the
    /// scripted activities.
    pub fn set_team_athletes(&self, team_id: &str, athletes: Vec<u64>) {
        self.team_athletes
            .lock()
            .unwrap()
            .insert(team_id.to_string(), athletes);
    }

    pub fn set_member_count(&self, team_id: &str, members: u32) {
        self.member_counts
            .lock()
            .unwrap()
            .insert(team_id.to_string(), members);
    }

    pub fn fail_team(&self, team_id: &str) {
        self.failing_teams
            .lock()
            .unwrap()
            .insert(team_id.to_string());
    }

    /// Make every detail fetch fail with a Strava API error.
    pub fn fail_fetch(&self, message: &str) {
        *self.fetch_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay_fetch(&self, delay: std::time::Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_list(&self, delay: std::time::Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn forgotten(&self) -> Vec<u64> {
        self.forgotten.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivitySource for FakeSource {
    async fn fetch_activity(
        &self,
        _athlete: &Athlete,
        activity_id: u64,
    ) -> Result<ActivityDetail, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.fetch_failure.lock().unwrap().clone() {
            return Err(AppError::StravaApi(message));
        }
        self.details
            .lock()
            .unwrap()
            .get(&activity_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))
    }

    async fn list_team_activities(
        &self,
        team: &Team,
        after: DateTime<Utc>,
    ) -> Result<TeamPull, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_teams.lock().unwrap().contains(&team.id) {
            return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
        }

        let activities: Vec<ActivityDetail> = self
            .team_activities
            .lock()
            .unwrap()
            .get(&team.id)
            .map(|list| {
                list.iter()
                    .filter(|d| d.start_date >= after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let athletes: BTreeSet<u64> = match self.team_athletes.lock().unwrap().get(&team.id) {
            Some(listed) => listed.iter().copied().collect(),
            None => activities.iter().map(|d| d.athlete_id).collect(),
        };

        Ok(TeamPull {
            activities,
            athletes,
        })
    }

    async fn team_member_count(&self, team: &Team) -> Result<u32, AppError> {
        if self.failing_teams.lock().unwrap().contains(&team.id) {
            return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
        }
        Ok(self
            .member_counts
            .lock()
            .unwrap()
            .get(&team.id)
            .copied()
            .unwrap_or(0))
    }

    fn forget_athlete(&self, athlete_id: u64) {
        self.forgotten.lock().unwrap().push(athlete_id);
    }
}

// ─── Failing Store ───────────────────────────────────────────

/// In-memory store whose weekly slice writes can be made to fail.
#[allow(dead_code)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_week_writes: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_week_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_week_writes(&self, fail: bool) {
        self.fail_week_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get_athlete(&self, athlete_id: u64) -> Result<Option<Athlete>, AppError> {
        self.inner.get_athlete(athlete_id).await
    }

    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<(), AppError> {
        self.inner.upsert_athlete(athlete).await
    }

    async fn delete_athlete(&self, athlete_id: u64) -> Result<(), AppError> {
        self.inner.delete_athlete(athlete_id).await
    }

    async fn list_athletes(&self) -> Result<Vec<Athlete>, AppError> {
        self.inner.list_athletes().await
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        self.inner.get_activity(activity_id).await
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.inner.upsert_activity(activity).await
    }

    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError> {
        self.inner.insert_activity_if_absent(activity).await
    }

    async fn delete_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        self.inner.delete_activity(activity_id).await
    }

    async fn activities_for_team(&self, team_id: &str) -> Result<Vec<Activity>, AppError> {
        self.inner.activities_for_team(team_id).await
    }

    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<Activity>, AppError> {
        self.inner.activities_for_athlete(athlete_id).await
    }

    async fn get_team_stats(&self, team_id: &str) -> Result<Option<TeamStats>, AppError> {
        self.inner.get_team_stats(team_id).await
    }

    async fn put_team_stats(&self, stats: &TeamStats) -> Result<(), AppError> {
        self.inner.put_team_stats(stats).await
    }

    async fn list_team_stats(&self) -> Result<Vec<TeamStats>, AppError> {
        self.inner.list_team_stats().await
    }

    async fn get_team_week(
        &self,
        week_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamWeekStats>, AppError> {
        self.inner.get_team_week(week_id, team_id).await
    }

    async fn put_team_week(&self, stats: &TeamWeekStats) -> Result<(), AppError> {
        if self.fail_week_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("team_weeks unavailable".to_string()));
        }
        self.inner.put_team_week(stats).await
    }

    async fn list_team_weeks(&self, week_id: &str) -> Result<Vec<TeamWeekStats>, AppError> {
        self.inner.list_team_weeks(week_id).await
    }
}

// ─── Test App ────────────────────────────────────────────────

/// Router plus handles on the in-memory store and fake source behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub source: Arc<FakeSource>,
}

#[allow(dead_code)]
impl TestApp {
    /// Store athletes directly, bypassing OAuth.
    pub async fn seed_athletes(&self, athletes: &[Athlete]) {
        for athlete in athletes {
            self.store.upsert_athlete(athlete).await.unwrap();
        }
    }
}

/// Create a test app backed by memory and a scripted source.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeSource::default());
    let state = Arc::new(AppState::new(config, store.clone(), source.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        source,
    }
}

/// Test app whose state writes through a `FlakyStore`. `TestApp::store`
/// still reads the underlying memory store directly.
#[allow(dead_code)]
pub fn create_flaky_test_app() -> (TestApp, Arc<FlakyStore>) {
    let store = Arc::new(MemoryStore::new());
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    let source = Arc::new(FakeSource::default());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        flaky.clone(),
        source.clone(),
    ));

    let app = TestApp {
        router: create_router(state.clone()),
        state,
        store,
        source,
    };
    (app, flaky)
}
