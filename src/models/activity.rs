// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity models: the stored source fact and the provider detail it is built from.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stored activity record.
///
/// Immutable once ingested: the team is resolved at ingestion time and
/// never re-derived from the athlete record afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID (also used as document ID)
    pub activity_id: u64,
    /// Strava athlete ID (owner)
    pub athlete_id: u64,
    /// Team the activity counts for
    pub team_id: String,
    /// Sport type (Run, Hike, Workout, etc.)
    #[serde(default)]
    pub sport_type: String,
    /// Start instant
    pub start_date: DateTime<Utc>,
    /// Offset of the athlete's local time from UTC, in seconds
    #[serde(default)]
    pub utc_offset_secs: i32,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: i64,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Calories burned (kcal), when the provider reports them
    #[serde(default)]
    pub calories: Option<f64>,
    /// Activity name/title
    #[serde(default)]
    pub name: String,
    /// Source: "webhook" or "resync"
    pub source: String,
    /// When this activity was ingested
    pub ingested_at: String,
}

impl Activity {
    /// Build a stored record from provider detail, stamping the team.
    pub fn from_detail(detail: ActivityDetail, team_id: &str, source: &str, now: &str) -> Self {
        Self {
            activity_id: detail.activity_id,
            athlete_id: detail.athlete_id,
            team_id: team_id.to_string(),
            sport_type: detail.sport_type,
            start_date: detail.start_date,
            utc_offset_secs: detail.utc_offset_secs,
            moving_time: detail.moving_time,
            distance: detail.distance,
            calories: detail.calories,
            name: detail.name,
            source: source.to_string(),
            ingested_at: now.to_string(),
        }
    }

    /// Moving time for raw totals; negative values count as zero.
    pub fn moving_seconds(&self) -> u64 {
        self.moving_time.max(0) as u64
    }

    /// Distance for raw totals; negative or NaN values count as zero.
    pub fn distance_meters(&self) -> f64 {
        if self.distance.is_finite() && self.distance > 0.0 {
            self.distance
        } else {
            0.0
        }
    }

    pub fn calories_or_zero(&self) -> f64 {
        match self.calories {
            Some(c) if c.is_finite() && c > 0.0 => c,
            _ => 0.0,
        }
    }

    /// Calendar date in the athlete's local time.
    pub fn local_day(&self) -> NaiveDate {
        (self.start_date + Duration::seconds(i64::from(self.utc_offset_secs))).date_naive()
    }
}

/// Activity detail as returned by the tracking provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub activity_id: u64,
    pub athlete_id: u64,
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    pub utc_offset_secs: i32,
    pub moving_time: i64,
    pub distance: f64,
    pub calories: Option<f64>,
    pub name: String,
}
