// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity eligibility and points scoring.
//!
//! Pure functions only. Raw totals (activity count, hours, calories) are
//! computed elsewhere and ignore eligibility; every points value here
//! applies eligibility first.

use crate::models::Activity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum moving time for an activity to score (inclusive).
pub const MIN_MOVING_TIME_SECS: i64 = 15 * 60;
/// Minimum distance for activity classes with a distance coefficient.
pub const MIN_DISTANCE_METERS: f64 = 1000.0;
/// Time points per local day are capped at this many minutes.
pub const DAILY_TIME_CAP_MINUTES: f64 = 180.0;
pub const MINUTES_PER_POINT: f64 = 10.0;
pub const CALORIES_PER_POINT: f64 = 200.0;

/// Activity classes with their distance coefficient (points per km).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityClass {
    Run,
    Hike,
    Walk,
    Ride,
    Swim,
    Paddle,
    LightCardio,
    Strength,
    Flexibility,
    Other,
}

impl ActivityClass {
    pub fn from_sport_type(sport_type: &str) -> Self {
        match sport_type {
            "Run" | "TrailRun" | "VirtualRun" => Self::Run,
            "Hike" => Self::Hike,
            "Walk" => Self::Walk,
            "Ride" | "EBikeRide" | "EMountainBikeRide" | "GravelRide" | "MountainBikeRide"
            | "VirtualRide" | "Handcycle" | "Velomobile" | "Wheelchair" => Self::Ride,
            "Swim" => Self::Swim,
            "Rowing" | "VirtualRow" | "Canoeing" | "Kayaking" | "StandUpPaddling" => Self::Paddle,
            "Elliptical" | "StairStepper" => Self::LightCardio,
            "WeightTraining" | "Workout" | "Crossfit" | "HighIntensityIntervalTraining" => {
                Self::Strength
            }
            "Yoga" | "Pilates" | "Stretching" => Self::Flexibility,
            _ => Self::Other,
        }
    }

    pub fn distance_coefficient(self) -> f64 {
        match self {
            Self::Run => 1.0,
            Self::Hike => 0.7,
            Self::Walk => 0.5,
            Self::Ride => 0.3,
            Self::Swim => 3.0,
            Self::Paddle => 1.5,
            Self::LightCardio => 0.2,
            Self::Strength | Self::Flexibility | Self::Other => 0.0,
        }
    }
}

pub fn distance_coefficient(sport_type: &str) -> f64 {
    ActivityClass::from_sport_type(sport_type).distance_coefficient()
}

/// Whether the activity type is one of the known challenge categories.
pub fn is_known_type(sport_type: &str) -> bool {
    ActivityClass::from_sport_type(sport_type) != ActivityClass::Other
}

/// Points breakdown for one activity or an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub time_points: f64,
    pub distance_points: f64,
    pub calories_points: f64,
    pub total_points: f64,
}

impl Score {
    fn new(time_points: f64, distance_points: f64, calories_points: f64) -> Self {
        Self {
            time_points,
            distance_points,
            calories_points,
            total_points: time_points + distance_points + calories_points,
        }
    }
}

/// Scoring rules anchored at the challenge start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    challenge_start: DateTime<Utc>,
}

impl ScoringRules {
    pub fn new(challenge_start: DateTime<Utc>) -> Self {
        Self { challenge_start }
    }

    pub fn is_eligible(&self, activity: &Activity) -> bool {
        if activity.moving_time < MIN_MOVING_TIME_SECS {
            return false;
        }
        if distance_coefficient(&activity.sport_type) > 0.0
            && (activity.distance.is_nan() || activity.distance < MIN_DISTANCE_METERS)
        {
            return false;
        }
        activity.start_date >= self.challenge_start
    }

    /// Points for a single activity, without the daily time cap.
    pub fn score_one(&self, activity: &Activity) -> Score {
        if !self.is_eligible(activity) {
            return Score::default();
        }
        Score::new(
            minutes(activity) / MINUTES_PER_POINT,
            distance_points(activity),
            activity.calories_or_zero() / CALORIES_PER_POINT,
        )
    }

    /// Aggregate points over a set of activities, time capped per local day.
    pub fn score_many<'a, I>(&self, activities: I) -> Score
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut tally = PointsTally::default();
        for activity in activities {
            tally.add(self, activity);
        }
        tally.score()
    }
}

fn minutes(activity: &Activity) -> f64 {
    activity.moving_seconds() as f64 / 60.0
}

fn distance_points(activity: &Activity) -> f64 {
    activity.distance_meters() / 1000.0 * distance_coefficient(&activity.sport_type)
}

/// Incremental accumulator behind `score_many`.
///
/// Keeps eligible moving seconds per local day so the daily cap can be
/// applied to any later total. Distance and calorie points are uncapped
/// and summed directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsTally {
    /// Eligible moving seconds keyed by local date (`YYYY-MM-DD`)
    #[serde(default)]
    pub seconds_by_day: BTreeMap<String, u64>,
    #[serde(default)]
    pub distance_points: f64,
    #[serde(default)]
    pub calories_points: f64,
}

impl PointsTally {
    /// Add one activity. Ineligible activities leave the tally unchanged.
    pub fn add(&mut self, rules: &ScoringRules, activity: &Activity) {
        if !rules.is_eligible(activity) {
            return;
        }
        *self
            .seconds_by_day
            .entry(activity.local_day().to_string())
            .or_insert(0) += activity.moving_seconds();
        self.distance_points += distance_points(activity);
        self.calories_points += activity.calories_or_zero() / CALORIES_PER_POINT;
    }

    pub fn time_points(&self) -> f64 {
        self.seconds_by_day
            .values()
            .map(|&secs| (secs as f64 / 60.0).min(DAILY_TIME_CAP_MINUTES) / MINUTES_PER_POINT)
            .sum()
    }

    pub fn score(&self) -> Score {
        Score::new(self.time_points(), self.distance_points, self.calories_points)
    }

    pub fn total_points(&self) -> f64 {
        self.score().total_points
    }
}
