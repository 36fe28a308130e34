// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard building: team slices from activities, the ranked
//! documents materialized from slices, and the store reads behind them.
//!
//! Two independent rankings exist. Overall ranks teams by the summed
//! points of their top athletes; weekly ranks teams by raw moving time
//! and hands out award points by position. Ties in either keep roster
//! order.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{
    Activity, AthleteProfile, AthleteStats, AthleteTally, ChallengeCalendar, OverallStats,
    PointsBreakdown, RecentActivity, Roster, Team, TeamStanding, TeamStats, TeamWeekStats,
    TopMember, Week, WeeklyStats, WeeklyTeamEntry,
};
use crate::services::scoring::ScoringRules;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Athletes whose points count toward a team's total.
pub const TOP_SCORERS_PER_TEAM: usize = 10;
/// Athletes listed per team in the overall document.
pub const TOP_MEMBERS_DISPLAYED: usize = 5;
/// Weekly award points by rank; lower ranks get nothing.
pub const WEEKLY_AWARDS: [u32; 5] = [50, 40, 30, 20, 10];
/// Activities listed in the athlete view.
pub const RECENT_ACTIVITIES: usize = 5;

pub fn award_for_rank(position: usize) -> u32 {
    WEEKLY_AWARDS.get(position).copied().unwrap_or(0)
}

/// Round for presentation (one decimal).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn hours(seconds: u64) -> f64 {
    seconds as f64 / 3600.0
}

/// Activities in a fixed order so float sums do not depend on storage order.
fn ordered(activities: &[Activity]) -> Vec<&Activity> {
    let mut ordered: Vec<&Activity> = activities.iter().collect();
    ordered.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(a.activity_id.cmp(&b.activity_id))
    });
    ordered
}

// ─── Slice Building ──────────────────────────────────────────

/// Rebuild a team's overall slice from its stored activities.
pub fn build_team_stats(
    rules: &ScoringRules,
    team_id: &str,
    members: u32,
    activities: &[Activity],
    profiles: &HashMap<u64, AthleteProfile>,
    now: &str,
) -> TeamStats {
    let mut by_athlete: BTreeMap<u64, Vec<&Activity>> = BTreeMap::new();
    for activity in ordered(activities) {
        by_athlete
            .entry(activity.athlete_id)
            .or_default()
            .push(activity);
    }

    let mut stats = TeamStats::empty(team_id, members);
    for (athlete_id, mine) in by_athlete {
        let profile = profiles
            .get(&athlete_id)
            .cloned()
            .unwrap_or_else(|| AthleteProfile::unknown(athlete_id));
        let tally = AthleteTally::from_activities(rules, athlete_id, &profile, mine);
        stats.put_athlete(tally, now);
    }
    stats.updated_at = now.to_string();
    stats
}

/// Rebuild one athlete's tally from their activities on a team.
///
/// Gives the same tally `build_team_stats` would for that athlete.
pub fn build_athlete_tally(
    rules: &ScoringRules,
    athlete_id: u64,
    profile: &AthleteProfile,
    activities: &[Activity],
) -> AthleteTally {
    let mine = ordered(activities)
        .into_iter()
        .filter(|a| a.athlete_id == athlete_id);
    AthleteTally::from_activities(rules, athlete_id, profile, mine)
}

/// Partition a team's activities into one slice per week in `weeks`.
///
/// Every week gets a slice, including weeks with no activity.
/// Activities outside `weeks` are ignored.
pub fn build_team_weeks(
    calendar: &ChallengeCalendar,
    team_id: &str,
    activities: &[Activity],
    weeks: &[Week],
    now: &str,
) -> Vec<TeamWeekStats> {
    let mut slices: Vec<TeamWeekStats> = weeks
        .iter()
        .map(|week| {
            let mut slice = TeamWeekStats::empty(team_id, week.number, &week.id);
            slice.updated_at = now.to_string();
            slice
        })
        .collect();
    let by_number: HashMap<u32, usize> = weeks
        .iter()
        .enumerate()
        .map(|(idx, week)| (week.number, idx))
        .collect();

    for activity in ordered(activities) {
        let slot = calendar
            .week_number_for(activity.start_date)
            .and_then(|n| by_number.get(&n));
        if let Some(&idx) = slot {
            slices[idx].add_activity(activity, now);
        }
    }

    slices
}

// ─── Materialization ─────────────────────────────────────────

fn top_member(tally: &AthleteTally) -> TopMember {
    TopMember {
        athlete_id: tally.athlete_id,
        name: tally.name.clone(),
        avatar_url: tally.avatar_url.clone(),
        activities: tally.activities,
        hours: round1(hours(tally.moving_time)),
        distance_km: round1(tally.distance / 1000.0),
        calories: tally.calories.round(),
        points: round1(tally.total_points()),
        last_activity_date: tally.last_activity_date.map(format_utc_rfc3339),
        last_activity_type: tally.last_activity_type.clone(),
    }
}

fn standing(team: &Team, slice: &TeamStats) -> (f64, TeamStanding) {
    let points = slice.top_points(TOP_SCORERS_PER_TEAM);
    let top_members = slice
        .ranked_athletes()
        .into_iter()
        .take(TOP_MEMBERS_DISPLAYED)
        .map(top_member)
        .collect();

    (
        points,
        TeamStanding {
            rank: 0,
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            avatar_url: team.avatar_url.clone(),
            strava_club_url: team.strava_club_url.clone(),
            total_activities: slice.total_activities,
            total_hours: round1(slice.hours()),
            total_distance_km: round1(slice.total_distance / 1000.0),
            total_calories: slice.total_calories.round(),
            total_points: round1(points),
            members: slice.members,
            top_members,
        },
    )
}

/// Overall document for every roster team. Missing slices count as zero.
pub fn materialize_overall(
    roster: &Roster,
    slices: &[TeamStats],
    now: DateTime<Utc>,
) -> OverallStats {
    let by_team: HashMap<&str, &TeamStats> =
        slices.iter().map(|s| (s.team_id.as_str(), s)).collect();

    let mut standings: Vec<(f64, TeamStanding)> = roster
        .teams()
        .iter()
        .map(|team| match by_team.get(team.id.as_str()) {
            Some(slice) => standing(team, slice),
            None => standing(team, &TeamStats::empty(&team.id, 0)),
        })
        .collect();

    // Stable sort keeps roster order for equal points
    standings.sort_by(|a, b| b.0.total_cmp(&a.0));

    OverallStats {
        teams: standings
            .into_iter()
            .enumerate()
            .map(|(idx, (_, mut team))| {
                team.rank = idx as u32 + 1;
                team
            })
            .collect(),
        last_updated: format_utc_rfc3339(now),
    }
}

/// Weekly document for one week, ranked by moving time with award points.
pub fn materialize_week(
    roster: &Roster,
    week: &Week,
    slices: &[TeamWeekStats],
    members: &HashMap<String, u32>,
    now: DateTime<Utc>,
) -> WeeklyStats {
    let by_team: HashMap<&str, &TeamWeekStats> = slices
        .iter()
        .filter(|s| s.week_id == week.id)
        .map(|s| (s.team_id.as_str(), s))
        .collect();

    let mut rows: Vec<(u64, WeeklyTeamEntry)> = roster
        .teams()
        .iter()
        .map(|team| {
            let (activities, moving_time) = by_team
                .get(team.id.as_str())
                .map(|s| (s.activities, s.moving_time))
                .unwrap_or((0, 0));
            (
                moving_time,
                WeeklyTeamEntry {
                    rank: 0,
                    team_id: team.id.clone(),
                    team_name: team.name.clone(),
                    activities,
                    hours: round1(hours(moving_time)),
                    points: 0,
                    members: members.get(&team.id).copied().unwrap_or(0),
                },
            )
        })
        .collect();

    // Stable sort keeps roster order for equal moving time
    rows.sort_by(|a, b| b.0.cmp(&a.0));

    WeeklyStats {
        week: week.number,
        week_id: week.id.clone(),
        label: week.label(),
        teams: rows
            .into_iter()
            .enumerate()
            .map(|(idx, (_, mut entry))| {
                entry.rank = idx as u32 + 1;
                entry.points = award_for_rank(idx);
                entry
            })
            .collect(),
        week_start: format_utc_rfc3339(week.start),
        week_end: format_utc_rfc3339(week.end),
        last_updated: format_utc_rfc3339(now),
    }
}

// ─── Athlete View ────────────────────────────────────────────

/// Per-athlete stats. Raw totals count every activity; points apply
/// eligibility and the daily cap.
pub fn athlete_stats(
    rules: &ScoringRules,
    athlete_id: u64,
    profile: &AthleteProfile,
    team: Option<&Team>,
    activities: &[Activity],
) -> AthleteStats {
    let moving_time: u64 = activities.iter().map(Activity::moving_seconds).sum();
    let distance: f64 = activities.iter().map(Activity::distance_meters).sum();
    let calories: f64 = activities.iter().map(Activity::calories_or_zero).sum();
    let score = rules.score_many(ordered(activities));

    let mut newest = ordered(activities);
    newest.reverse();
    let recent_activities = newest
        .into_iter()
        .take(RECENT_ACTIVITIES)
        .map(|activity| RecentActivity {
            activity_id: activity.activity_id,
            name: activity.name.clone(),
            sport_type: activity.sport_type.clone(),
            start_date: format_utc_rfc3339(activity.start_date),
            hours: round1(hours(activity.moving_seconds())),
            distance_km: round1(activity.distance_meters() / 1000.0),
            calories: activity.calories_or_zero().round(),
            points: round1(rules.score_one(activity).total_points),
        })
        .collect();

    AthleteStats {
        athlete_id,
        name: profile.name.clone(),
        avatar_url: profile.avatar_url.clone(),
        team_id: team.map(|t| t.id.clone()),
        team_name: team.map(|t| t.name.clone()),
        total_activities: activities.len() as u32,
        total_hours: round1(hours(moving_time)),
        total_distance_km: round1(distance / 1000.0),
        total_calories: calories.round(),
        points: PointsBreakdown {
            time_points: round1(score.time_points),
            distance_points: round1(score.distance_points),
            calories_points: round1(score.calories_points),
            total_points: round1(score.total_points),
        },
        recent_activities,
    }
}

// ─── Reads ───────────────────────────────────────────────────

/// Current overall document. Slices are always read fresh.
pub async fn load_overall(
    store: &dyn DocumentStore,
    roster: &Roster,
    now: DateTime<Utc>,
) -> Result<OverallStats, AppError> {
    let slices = store.list_team_stats().await?;
    Ok(materialize_overall(roster, &slices, now))
}

/// Current document for one week. `members` comes from the overall slices.
pub async fn load_week(
    store: &dyn DocumentStore,
    roster: &Roster,
    week: &Week,
    members: &HashMap<String, u32>,
    now: DateTime<Utc>,
) -> Result<WeeklyStats, AppError> {
    let slices = store.list_team_weeks(&week.id).await?;
    Ok(materialize_week(roster, week, &slices, members, now))
}

/// Every week from the challenge start through `now`, newest last.
pub async fn load_weekly(
    store: &dyn DocumentStore,
    roster: &Roster,
    calendar: &ChallengeCalendar,
    now: DateTime<Utc>,
) -> Result<Vec<WeeklyStats>, AppError> {
    let members: HashMap<String, u32> = store
        .list_team_stats()
        .await?
        .into_iter()
        .map(|s| (s.team_id, s.members))
        .collect();

    let mut weeks = Vec::new();
    for week in calendar.weeks_until(now) {
        weeks.push(load_week(store, roster, &week, &members, now).await?);
    }
    Ok(weeks)
}

/// Stats view for one registered athlete.
pub async fn load_athlete(
    store: &dyn DocumentStore,
    roster: &Roster,
    rules: &ScoringRules,
    athlete_id: u64,
) -> Result<AthleteStats, AppError> {
    let athlete = store
        .get_athlete(athlete_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("athlete {}", athlete_id)))?;
    let activities = store.activities_for_athlete(athlete_id).await?;

    Ok(athlete_stats(
        rules,
        athlete_id,
        &AthleteProfile::from_athlete(&athlete),
        roster.resolve_team(&athlete),
        &activities,
    ))
}
