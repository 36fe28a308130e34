// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk resync: pull every team's activities once, store what is new, drop
//! what is gone upstream, and rebuild every overall and weekly slice from
//! the stored activities.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Activity, ChallengeCalendar, OverallStats, Roster, Team, Week, WeeklyStats};
use crate::services::leaderboard::{load_overall, load_week};
use crate::services::locks::KeyedLocks;
use crate::services::reconcile::recompute_team;
use crate::services::scoring::{is_known_type, ScoringRules};
use crate::services::source::ActivitySource;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Source tag stamped on activities first seen by a resync.
pub const RESYNC_SOURCE: &str = "resync";

/// Materialized result of one resync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncReport {
    pub overall: OverallStats,
    pub weeks: Vec<WeeklyStats>,
    pub teams_synced: u32,
    pub activities_ingested: u32,
    /// Stored activities no longer present upstream
    pub activities_removed: u32,
    /// Teams whose pull failed; their slices were left untouched
    pub failed_teams: Vec<String>,
}

#[derive(Clone)]
pub struct BulkResync {
    store: Arc<dyn DocumentStore>,
    source: Arc<dyn ActivitySource>,
    roster: Arc<Roster>,
    calendar: ChallengeCalendar,
    rules: ScoringRules,
    locks: KeyedLocks<String>,
    running: Arc<Mutex<()>>,
    fetch_timeout: Duration,
}

impl BulkResync {
    /// `locks` must be shared with the event reconciler so a team is never
    /// resynced and reconciled at the same time.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn ActivitySource>,
        roster: Arc<Roster>,
        calendar: ChallengeCalendar,
        locks: KeyedLocks<String>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            roster,
            calendar,
            rules: ScoringRules::new(calendar.start()),
            locks,
            running: Arc::new(Mutex::new(())),
            fetch_timeout,
        }
    }

    /// Run a full resync. Only one runs at a time; a second caller gets
    /// `AppError::Conflict`.
    pub async fn run(&self) -> Result<ResyncReport, AppError> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| AppError::Conflict("Resync already running".to_string()))?;

        let now = Utc::now();
        tracing::info!(teams = self.roster.teams().len(), "Starting resync");

        let mut teams_synced = 0;
        let mut activities_ingested = 0;
        let mut activities_removed = 0;
        let mut failed_teams = Vec::new();

        for team in self.roster.teams() {
            match self.sync_team(team, now).await {
                Ok(synced) => {
                    teams_synced += 1;
                    activities_ingested += synced.ingested;
                    activities_removed += synced.removed;
                }
                Err(e) => {
                    tracing::error!(team_id = %team.id, error = %e, "Team resync failed");
                    failed_teams.push(team.id.clone());
                }
            }
        }

        let overall = load_overall(self.store.as_ref(), &self.roster, now).await?;
        let members: HashMap<String, u32> = overall
            .teams
            .iter()
            .map(|t| (t.team_id.clone(), t.members))
            .collect();

        let weeks: Vec<Week> = self.calendar.weeks_until(now);
        let mut documents = Vec::with_capacity(weeks.len());
        for week in &weeks {
            let doc = load_week(self.store.as_ref(), &self.roster, week, &members, now).await?;
            tracing::info!(week = week.number, week_id = %week.id, "Week resynced");
            documents.push(doc);
        }

        tracing::info!(
            teams_synced,
            activities_ingested,
            activities_removed,
            failed = failed_teams.len(),
            "Resync complete"
        );

        Ok(ResyncReport {
            overall,
            weeks: documents,
            teams_synced,
            activities_ingested,
            activities_removed,
            failed_teams,
        })
    }

    /// Pull, store and recompute one team. Nothing is written unless both
    /// pulls succeed.
    async fn sync_team(&self, team: &Team, now: DateTime<Utc>) -> Result<TeamSync, AppError> {
        let _guard = self.locks.lock(&team.id).await;

        // Each upstream page is bounded by the client timeout; the member
        // count is a single call.
        let pull = self
            .source
            .list_team_activities(team, self.calendar.start())
            .await?;
        let members = tokio::time::timeout(self.fetch_timeout, self.source.team_member_count(team))
            .await
            .map_err(|_| AppError::Timeout(format!("member count for team {}", team.id)))??;

        let now_str = format_utc_rfc3339(now);
        let pulled: HashSet<u64> = pull.activities.iter().map(|d| d.activity_id).collect();

        // Only activities the pull could have returned are candidates:
        // listed athletes, known types.
        let mut removed = 0;
        for stored in self.store.activities_for_team(&team.id).await? {
            if pull.athletes.contains(&stored.athlete_id)
                && is_known_type(&stored.sport_type)
                && !pulled.contains(&stored.activity_id)
                && self.store.delete_activity(stored.activity_id).await?.is_some()
            {
                tracing::info!(
                    team_id = %team.id,
                    activity_id = stored.activity_id,
                    athlete_id = stored.athlete_id,
                    "Removing activity gone upstream"
                );
                removed += 1;
            }
        }

        let mut ingested = 0;
        for detail in pull.activities {
            if detail.start_date < self.calendar.start() {
                continue;
            }
            let activity = Activity::from_detail(detail, &team.id, RESYNC_SOURCE, &now_str);
            if self.store.insert_activity_if_absent(&activity).await? {
                ingested += 1;
            }
        }

        let stats = recompute_team(
            self.store.as_ref(),
            &self.rules,
            &self.calendar,
            &team.id,
            Some(members),
            now,
        )
        .await?;

        tracing::info!(
            team_id = %team.id,
            activities = stats.total_activities,
            hours = stats.hours(),
            members,
            ingested,
            removed,
            "Team resynced"
        );

        Ok(TeamSync { ingested, removed })
    }
}

/// Activity changes made while syncing one team.
struct TeamSync {
    ingested: u32,
    removed: u32,
}
