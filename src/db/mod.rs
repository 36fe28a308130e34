//! Document store layer (Firestore or in-memory).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Activity, Athlete, TeamStats, TeamWeekStats};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const ATHLETES: &str = "athletes";
    pub const ACTIVITIES: &str = "activities";
    /// Overall team slices (keyed by team_id)
    pub const TEAM_STATS: &str = "team_stats";
    /// Weekly team slices (keyed by `{week_id}_{team_id}`)
    pub const TEAM_WEEKS: &str = "team_weeks";
}

/// Generic document store.
///
/// Every `put_*` replaces one document wholesale. Callers serialize
/// read-modify-write cycles on the same team themselves.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─── Athletes ────────────────────────────────────────────────
    async fn get_athlete(&self, athlete_id: u64) -> Result<Option<Athlete>, AppError>;
    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<(), AppError>;
    async fn delete_athlete(&self, athlete_id: u64) -> Result<(), AppError>;
    async fn list_athletes(&self) -> Result<Vec<Athlete>, AppError>;

    // ─── Activities ──────────────────────────────────────────────
    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError>;
    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError>;
    /// Store the activity unless its id is already present. Returns `true`
    /// when it was inserted.
    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError>;
    /// Remove an activity, returning the removed record if it existed.
    async fn delete_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError>;
    async fn activities_for_team(&self, team_id: &str) -> Result<Vec<Activity>, AppError>;
    /// Activities of one athlete, newest first.
    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<Activity>, AppError>;

    // ─── Aggregate Slices ────────────────────────────────────────
    async fn get_team_stats(&self, team_id: &str) -> Result<Option<TeamStats>, AppError>;
    async fn put_team_stats(&self, stats: &TeamStats) -> Result<(), AppError>;
    async fn list_team_stats(&self) -> Result<Vec<TeamStats>, AppError>;
    async fn get_team_week(
        &self,
        week_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamWeekStats>, AppError>;
    async fn put_team_week(&self, stats: &TeamWeekStats) -> Result<(), AppError>;
    async fn list_team_weeks(&self, week_id: &str) -> Result<Vec<TeamWeekStats>, AppError>;
}
