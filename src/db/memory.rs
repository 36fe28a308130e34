// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for local runs and tests.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Activity, Athlete, TeamStats, TeamWeekStats};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Document store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    athletes: RwLock<HashMap<u64, Athlete>>,
    activities: RwLock<BTreeMap<u64, Activity>>,
    team_stats: RwLock<BTreeMap<String, TeamStats>>,
    team_weeks: RwLock<BTreeMap<String, TeamWeekStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored activities.
    pub async fn activity_count(&self) -> usize {
        self.activities.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_athlete(&self, athlete_id: u64) -> Result<Option<Athlete>, AppError> {
        Ok(self.athletes.read().await.get(&athlete_id).cloned())
    }

    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<(), AppError> {
        self.athletes
            .write()
            .await
            .insert(athlete.athlete_id, athlete.clone());
        Ok(())
    }

    async fn delete_athlete(&self, athlete_id: u64) -> Result<(), AppError> {
        self.athletes.write().await.remove(&athlete_id);
        Ok(())
    }

    async fn list_athletes(&self) -> Result<Vec<Athlete>, AppError> {
        let mut athletes: Vec<Athlete> = self.athletes.read().await.values().cloned().collect();
        athletes.sort_by_key(|a| a.athlete_id);
        Ok(athletes)
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        Ok(self.activities.read().await.get(&activity_id).cloned())
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.activities
            .write()
            .await
            .insert(activity.activity_id, activity.clone());
        Ok(())
    }

    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError> {
        let mut activities = self.activities.write().await;
        if activities.contains_key(&activity.activity_id) {
            return Ok(false);
        }
        activities.insert(activity.activity_id, activity.clone());
        Ok(true)
    }

    async fn delete_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        Ok(self.activities.write().await.remove(&activity_id))
    }

    async fn activities_for_team(&self, team_id: &str) -> Result<Vec<Activity>, AppError> {
        Ok(self
            .activities
            .read()
            .await
            .values()
            .filter(|a| a.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<Activity>, AppError> {
        let mut activities: Vec<Activity> = self
            .activities
            .read()
            .await
            .values()
            .filter(|a| a.athlete_id == athlete_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(activities)
    }

    async fn get_team_stats(&self, team_id: &str) -> Result<Option<TeamStats>, AppError> {
        Ok(self.team_stats.read().await.get(team_id).cloned())
    }

    async fn put_team_stats(&self, stats: &TeamStats) -> Result<(), AppError> {
        self.team_stats
            .write()
            .await
            .insert(stats.team_id.clone(), stats.clone());
        Ok(())
    }

    async fn list_team_stats(&self) -> Result<Vec<TeamStats>, AppError> {
        Ok(self.team_stats.read().await.values().cloned().collect())
    }

    async fn get_team_week(
        &self,
        week_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamWeekStats>, AppError> {
        Ok(self
            .team_weeks
            .read()
            .await
            .get(&TeamWeekStats::doc_id_for(week_id, team_id))
            .cloned())
    }

    async fn put_team_week(&self, stats: &TeamWeekStats) -> Result<(), AppError> {
        self.team_weeks
            .write()
            .await
            .insert(stats.doc_id(), stats.clone());
        Ok(())
    }

    async fn list_team_weeks(&self, week_id: &str) -> Result<Vec<TeamWeekStats>, AppError> {
        Ok(self
            .team_weeks
            .read()
            .await
            .values()
            .filter(|w| w.week_id == week_id)
            .cloned()
            .collect())
    }
}
