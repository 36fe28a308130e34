// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook event reconciliation.
//!
//! Applies one provider event to the stored activities and the affected
//! team's aggregate slices. New activities are folded in incrementally by
//! rebuilding only the owner's tally; deletes and repeated creates
//! recompute the team from its stored activities, since the daily cap
//! makes points non-invertible.
//!
//! Every read-modify-write of a team's slices runs under that team's lock.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{
    Activity, AspectType, AthleteProfile, ChallengeCalendar, ObjectType, Roster, TeamStats,
    TeamWeekStats, Visibility, WebhookEvent,
};
use crate::services::leaderboard::{build_athlete_tally, build_team_stats, build_team_weeks};
use crate::services::locks::KeyedLocks;
use crate::services::scoring::ScoringRules;
use crate::services::source::ActivitySource;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Source tag stamped on activities ingested from webhooks.
pub const WEBHOOK_SOURCE: &str = "webhook";

/// Why an event left everything unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No stored credential for the owner
    UnknownAthlete,
    /// Owner resolves to no configured team
    Unaffiliated,
    BeforeChallengeStart,
    /// Activity not stored (delete) or gone upstream (create)
    UnknownActivity,
    /// Event kind with no effect on aggregates
    UnhandledEvent,
}

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// New activity folded into the team's slices
    Applied {
        activity_id: u64,
        team_id: String,
        week: u32,
    },
    /// Already-stored activity replaced and the team recomputed
    Recomputed { activity_id: u64, team_id: String },
    Deleted { activity_id: u64, team_id: String },
    AthleteRemoved { athlete_id: u64 },
    Skipped(SkipReason),
}

/// Reconciles webhook events against the document store.
#[derive(Clone)]
pub struct EventReconciler {
    store: Arc<dyn DocumentStore>,
    source: Arc<dyn ActivitySource>,
    roster: Arc<Roster>,
    calendar: ChallengeCalendar,
    rules: ScoringRules,
    locks: KeyedLocks<String>,
    fetch_timeout: Duration,
}

impl EventReconciler {
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
            fetch_timeout,
        }
    }

    /// Reconcile one event.
    ///
    /// No-op outcomes are returned as `Skipped`; only upstream and store
    /// failures are errors, and those leave the team's slices as they were.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<ReconcileOutcome, AppError> {
        let outcome = match (event.object_type, event.aspect_type) {
            (ObjectType::Activity, AspectType::Create) => {
                self.apply_create(event.owner_id, event.object_id).await?
            }
            (ObjectType::Activity, AspectType::Delete) => self.apply_delete(event.object_id).await?,
            (ObjectType::Activity, AspectType::Update) => match event.visibility_change() {
                Some(Visibility::Private) => self.apply_delete(event.object_id).await?,
                Some(Visibility::Public) => {
                    self.apply_create(event.owner_id, event.object_id).await?
                }
                None => ReconcileOutcome::Skipped(SkipReason::UnhandledEvent),
            },
            (ObjectType::Athlete, AspectType::Update) if event.is_deauthorization() => {
                self.remove_athlete(event.owner_id).await?
            }
            _ => ReconcileOutcome::Skipped(SkipReason::UnhandledEvent),
        };

        tracing::info!(
            object_type = ?event.object_type,
            aspect_type = ?event.aspect_type,
            object_id = event.object_id,
            owner_id = event.owner_id,
            outcome = ?outcome,
            "Event reconciled"
        );

        Ok(outcome)
    }

    async fn apply_create(
        &self,
        athlete_id: u64,
        activity_id: u64,
    ) -> Result<ReconcileOutcome, AppError> {
        let Some(athlete) = self.store.get_athlete(athlete_id).await? else {
            tracing::info!(athlete_id, activity_id, "No stored credential for athlete");
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownAthlete));
        };
        let Some(team) = self.roster.resolve_team(&athlete) else {
            tracing::info!(athlete_id, activity_id, "Athlete is not on a configured team");
            return Ok(ReconcileOutcome::Skipped(SkipReason::Unaffiliated));
        };

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.source.fetch_activity(&athlete, activity_id),
        )
        .await
        .map_err(|_| AppError::Timeout(format!("fetching activity {}", activity_id)))?;
        let detail = match fetched {
            Ok(detail) => detail,
            Err(AppError::NotFound(_)) => {
                tracing::warn!(athlete_id, activity_id, "Activity no longer exists upstream");
                return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownActivity));
            }
            Err(e) => return Err(e),
        };

        if detail.start_date < self.calendar.start() {
            tracing::info!(
                athlete_id,
                activity_id,
                start_date = %detail.start_date,
                "Activity predates challenge start"
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::BeforeChallengeStart));
        }

        // A stored activity keeps the team it was first stamped with
        let mut team_id = match self.store.get_activity(activity_id).await? {
            Some(existing) => existing.team_id,
            None => team.id.clone(),
        };

        loop {
            let _guard = self.locks.lock(&team_id).await;

            let existing = self.store.get_activity(activity_id).await?;
            let stored_team = existing
                .as_ref()
                .map_or_else(|| team.id.clone(), |a| a.team_id.clone());
            if stored_team != team_id {
                // Raced with another event for this activity; take the right lock
                team_id = stored_team;
                continue;
            }

            let now = Utc::now();
            let now_str = format_utc_rfc3339(now);
            let activity = Activity::from_detail(detail, &team_id, WEBHOOK_SOURCE, &now_str);

            if existing.is_some() {
                self.store.upsert_activity(&activity).await?;
                recompute_team(self.store.as_ref(), &self.rules, &self.calendar, &team_id, None, now)
                    .await?;
                return Ok(ReconcileOutcome::Recomputed {
                    activity_id,
                    team_id,
                });
            }

            // Activity first: a failed slice write is repaired by the redelivered
            // create taking the recompute path above.
            self.store.upsert_activity(&activity).await?;

            // Only this athlete's tally changes. Rebuilding it from their stored
            // activities keeps float sums identical to a full recompute.
            let profile = AthleteProfile::from_athlete(&athlete);
            let on_team: Vec<Activity> = self
                .store
                .activities_for_athlete(activity.athlete_id)
                .await?
                .into_iter()
                .filter(|a| a.team_id == team_id)
                .collect();
            let tally = build_athlete_tally(&self.rules, activity.athlete_id, &profile, &on_team);
            let mut overall = self
                .store
                .get_team_stats(&team_id)
                .await?
                .unwrap_or_else(|| TeamStats::empty(&team_id, 0));
            overall.put_athlete(tally, &now_str);

            let week = self
                .calendar
                .week_for(activity.start_date)
                .ok_or_else(|| anyhow::anyhow!("activity {} has no week", activity_id))?;
            let mut slice = self
                .store
                .get_team_week(&week.id, &team_id)
                .await?
                .unwrap_or_else(|| TeamWeekStats::empty(&team_id, week.number, &week.id));
            slice.add_activity(&activity, &now_str);

            self.store.put_team_stats(&overall).await?;
            self.store.put_team_week(&slice).await?;

            return Ok(ReconcileOutcome::Applied {
                activity_id,
                team_id,
                week: week.number,
            });
        }
    }

    async fn apply_delete(&self, activity_id: u64) -> Result<ReconcileOutcome, AppError> {
        let Some(existing) = self.store.get_activity(activity_id).await? else {
            tracing::info!(activity_id, "Delete for unknown activity");
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownActivity));
        };
        let team_id = existing.team_id;

        let _guard = self.locks.lock(&team_id).await;
        if self.store.delete_activity(activity_id).await?.is_none() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownActivity));
        }

        recompute_team(
            self.store.as_ref(),
            &self.rules,
            &self.calendar,
            &team_id,
            None,
            Utc::now(),
        )
        .await?;

        Ok(ReconcileOutcome::Deleted {
            activity_id,
            team_id,
        })
    }

    /// Drop the athlete's credential. Stored activities keep counting.
    async fn remove_athlete(&self, athlete_id: u64) -> Result<ReconcileOutcome, AppError> {
        self.store.delete_athlete(athlete_id).await?;
        self.source.forget_athlete(athlete_id);
        tracing::info!(athlete_id, "Athlete deauthorized");
        Ok(ReconcileOutcome::AthleteRemoved { athlete_id })
    }
}

/// Rebuild a team's overall slice and every weekly slice from its stored
/// activities. The caller must hold the team's lock.
///
/// `members` replaces the stored member count when given.
pub(crate) async fn recompute_team(
    store: &dyn DocumentStore,
    rules: &ScoringRules,
    calendar: &ChallengeCalendar,
    team_id: &str,
    members: Option<u32>,
    now: DateTime<Utc>,
) -> Result<TeamStats, AppError> {
    let activities = store.activities_for_team(team_id).await?;
    let previous = store.get_team_stats(team_id).await?;
    let members = members.unwrap_or_else(|| previous.as_ref().map_or(0, |s| s.members));
    let profiles = load_profiles(store, &activities, previous.as_ref()).await?;
    let now_str = format_utc_rfc3339(now);

    let stats = build_team_stats(rules, team_id, members, &activities, &profiles, &now_str);

    let horizon = activities
        .iter()
        .map(|a| a.start_date)
        .max()
        .map_or(now, |latest| latest.max(now));
    let weeks = calendar.weeks_until(horizon);
    let slices = build_team_weeks(calendar, team_id, &activities, &weeks, &now_str);

    store.put_team_stats(&stats).await?;
    for slice in &slices {
        store.put_team_week(slice).await?;
    }

    Ok(stats)
}

/// Display profiles for every athlete in `activities`. Athletes without a
/// stored record keep the name they had in the previous slice.
async fn load_profiles(
    store: &dyn DocumentStore,
    activities: &[Activity],
    previous: Option<&TeamStats>,
) -> Result<HashMap<u64, AthleteProfile>, AppError> {
    let mut profiles = HashMap::new();
    for activity in activities {
        let athlete_id = activity.athlete_id;
        if profiles.contains_key(&athlete_id) {
            continue;
        }
        let profile = match store.get_athlete(athlete_id).await? {
            Some(athlete) => AthleteProfile::from_athlete(&athlete),
            None => previous
                .and_then(|s| s.athletes.get(&athlete_id.to_string()))
                .map(|tally| AthleteProfile {
                    name: tally.name.clone(),
                    avatar_url: tally.avatar_url.clone(),
                })
                .unwrap_or_else(|| AthleteProfile::unknown(athlete_id)),
        };
        profiles.insert(athlete_id, profile);
    }
    Ok(profiles)
}
