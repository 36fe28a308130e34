//! Stored team aggregates.
//!
//! Each team's overall slice and each (team, week) slice is its own
//! document, so reconciliations for different teams never touch the same
//! record. Ranked leaderboard documents are materialized from these at
//! read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Activity, Athlete};
use crate::services::scoring::{PointsTally, ScoringRules};

/// Display data for an athlete inside a team slice.
#[derive(Debug, Clone, PartialEq)]
pub struct AthleteProfile {
    pub name: String,
    pub avatar_url: Option<String>,
}

impl AthleteProfile {
    pub fn from_athlete(athlete: &Athlete) -> Self {
        Self {
            name: athlete.display_name(),
            avatar_url: athlete.profile.clone(),
        }
    }

    /// Placeholder for athletes whose record is gone.
    pub fn unknown(athlete_id: u64) -> Self {
        Self {
            name: format!("Athlete {}", athlete_id),
            avatar_url: None,
        }
    }
}

/// Per-athlete running totals within a team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteTally {
    pub athlete_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,

    // ─── Raw Totals (eligibility ignored) ────────────────────────
    #[serde(default)]
    pub activities: u32,
    /// Moving time (seconds)
    #[serde(default)]
    pub moving_time: u64,
    /// Distance (meters)
    #[serde(default)]
    pub distance: f64,
    /// Calories (kcal)
    #[serde(default)]
    pub calories: f64,

    // ─── Last Activity ───────────────────────────────────────────
    #[serde(default)]
    pub last_activity_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity_type: Option<String>,

    // ─── Points (eligibility + daily cap) ────────────────────────
    #[serde(default)]
    pub points: PointsTally,
}

impl AthleteTally {
    fn new(athlete_id: u64, profile: &AthleteProfile) -> Self {
        Self {
            athlete_id,
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            ..Default::default()
        }
    }

    /// Tally of one athlete's activities, folded in the given order.
    ///
    /// Float sums depend on order, so callers pass activities sorted by
    /// start date and id. Equal inputs then give bit-identical tallies.
    pub fn from_activities<'a, I>(
        rules: &ScoringRules,
        athlete_id: u64,
        profile: &AthleteProfile,
        activities: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut tally = Self::new(athlete_id, profile);
        for activity in activities {
            tally.add(rules, activity);
        }
        tally
    }

    fn add(&mut self, rules: &ScoringRules, activity: &Activity) {
        self.activities += 1;
        self.moving_time += activity.moving_seconds();
        self.distance += activity.distance_meters();
        self.calories += activity.calories_or_zero();

        if self
            .last_activity_date
            .is_none_or(|last| activity.start_date >= last)
        {
            self.last_activity_date = Some(activity.start_date);
            self.last_activity_type = Some(activity.sport_type.clone());
        }

        self.points.add(rules, activity);
    }

    pub fn total_points(&self) -> f64 {
        self.points.total_points()
    }
}

/// Overall aggregate slice for one team.
///
/// Stored at: `team_stats/{team_id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_id: String,

    // ─── Raw Totals ──────────────────────────────────────────────
    #[serde(default)]
    pub total_activities: u32,
    /// Moving time (seconds)
    #[serde(default)]
    pub total_moving_time: u64,
    /// Distance (meters)
    #[serde(default)]
    pub total_distance: f64,
    /// Calories (kcal)
    #[serde(default)]
    pub total_calories: f64,

    /// Club member count, from the provider during resync
    #[serde(default)]
    pub members: u32,

    // ─── Per-Athlete ─────────────────────────────────────────────
    /// Keyed by athlete id (string keys for document storage)
    #[serde(default)]
    pub athletes: BTreeMap<String, AthleteTally>,

    // ─── Metadata ────────────────────────────────────────────────
    #[serde(default)]
    pub updated_at: String,
}

impl TeamStats {
    /// Zero slice for a team with no stored aggregate yet.
    pub fn empty(team_id: &str, members: u32) -> Self {
        Self {
            team_id: team_id.to_string(),
            members,
            ..Default::default()
        }
    }

    /// Replace one athlete's tally and refresh the team totals from the
    /// tallies.
    pub fn put_athlete(&mut self, tally: AthleteTally, now: &str) {
        self.athletes.insert(tally.athlete_id.to_string(), tally);
        self.refresh_totals();
        self.updated_at = now.to_string();
    }

    /// Team raw totals are summed over the tallies in key order, so they
    /// never depend on the order activities arrived in.
    fn refresh_totals(&mut self) {
        self.total_activities = 0;
        self.total_moving_time = 0;
        self.total_distance = 0.0;
        self.total_calories = 0.0;
        for tally in self.athletes.values() {
            self.total_activities += tally.activities;
            self.total_moving_time += tally.moving_time;
            self.total_distance += tally.distance;
            self.total_calories += tally.calories;
        }
    }

    /// Athletes ordered by aggregate points, highest first. Equal points
    /// keep athlete id order.
    pub fn ranked_athletes(&self) -> Vec<&AthleteTally> {
        let mut ranked: Vec<&AthleteTally> = self.athletes.values().collect();
        ranked.sort_by(|a, b| {
            b.total_points()
                .total_cmp(&a.total_points())
                .then(a.athlete_id.cmp(&b.athlete_id))
        });
        ranked
    }

    /// Sum of the top `n` athletes' aggregate points.
    pub fn top_points(&self, n: usize) -> f64 {
        self.ranked_athletes()
            .into_iter()
            .take(n)
            .map(AthleteTally::total_points)
            .sum()
    }

    pub fn hours(&self) -> f64 {
        self.total_moving_time as f64 / 3600.0
    }
}

/// Weekly aggregate slice for one (team, week) pair.
///
/// Stored at: `team_weeks/{week_id}_{team_id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamWeekStats {
    pub team_id: String,
    pub week: u32,
    /// Monday of the week (`YYYY-MM-DD`)
    pub week_id: String,
    #[serde(default)]
    pub activities: u32,
    /// Moving time (seconds)
    #[serde(default)]
    pub moving_time: u64,
    #[serde(default)]
    pub updated_at: String,
}

impl TeamWeekStats {
    pub fn empty(team_id: &str, week: u32, week_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            week,
            week_id: week_id.to_string(),
            ..Default::default()
        }
    }

    pub fn doc_id(&self) -> String {
        Self::doc_id_for(&self.week_id, &self.team_id)
    }

    pub fn doc_id_for(week_id: &str, team_id: &str) -> String {
        format!("{}_{}", week_id, team_id)
    }

    pub fn add_activity(&mut self, activity: &Activity, now: &str) {
        self.activities += 1;
        self.moving_time += activity.moving_seconds();
        self.updated_at = now.to_string();
    }

    pub fn hours(&self) -> f64 {
        self.moving_time as f64 / 3600.0
    }
}
