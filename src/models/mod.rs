// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod event;
pub mod leaderboard;
pub mod stats;
pub mod team;
pub mod week;

pub use activity::{Activity, ActivityDetail};
pub use athlete::Athlete;
pub use event::{AspectType, ObjectType, Visibility, WebhookEvent};
pub use leaderboard::{
    AthleteStats, OverallStats, PointsBreakdown, RecentActivity, TeamStanding, TopMember,
    WeeklyStats, WeeklyTeamEntry,
};
pub use stats::{AthleteProfile, AthleteTally, TeamStats, TeamWeekStats};
pub use team::{Roster, Team};
pub use week::{ChallengeCalendar, Week};
