// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Materialized leaderboard documents served to the UI.
//!
//! Built from the stored slices and the roster on every read; values are
//! rounded to one decimal here and nowhere else.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Overall leaderboard: teams ranked by the sum of their top athletes' points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OverallStats {
    pub teams: Vec<TeamStanding>,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TeamStanding {
    pub rank: u32,
    pub team_id: String,
    pub team_name: String,
    pub avatar_url: Option<String>,
    pub strava_club_url: Option<String>,
    pub total_activities: u32,
    pub total_hours: f64,
    pub total_distance_km: f64,
    pub total_calories: f64,
    pub total_points: f64,
    pub members: u32,
    pub top_members: Vec<TopMember>,
}

/// One of a team's highest-scoring athletes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TopMember {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub activities: u32,
    pub hours: f64,
    pub distance_km: f64,
    pub calories: f64,
    pub points: f64,
    pub last_activity_date: Option<String>,
    pub last_activity_type: Option<String>,
}

/// Weekly leaderboard for one week: teams ranked by hours with award points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyStats {
    pub week: u32,
    pub week_id: String,
    pub label: String,
    pub teams: Vec<WeeklyTeamEntry>,
    pub week_start: String,
    pub week_end: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyTeamEntry {
    pub rank: u32,
    pub team_id: String,
    pub team_name: String,
    pub activities: u32,
    pub hours: f64,
    /// Award points for the rank
    pub points: u32,
    pub members: u32,
}

/// Per-athlete stats view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    /// Raw totals, eligibility ignored
    pub total_activities: u32,
    pub total_hours: f64,
    pub total_distance_km: f64,
    pub total_calories: f64,
    /// Aggregate points, eligibility and daily cap applied
    pub points: PointsBreakdown,
    pub recent_activities: Vec<RecentActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PointsBreakdown {
    pub time_points: f64,
    pub distance_points: f64,
    pub calories_points: f64,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentActivity {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    pub name: String,
    pub sport_type: String,
    pub start_date: String,
    pub hours: f64,
    pub distance_km: f64,
    pub calories: f64,
    pub points: f64,
}
