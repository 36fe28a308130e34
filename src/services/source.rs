// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity provider seam.

use crate::error::AppError;
use crate::models::{ActivityDetail, Athlete, Team};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// One team's pulled activities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamPull {
    pub activities: Vec<ActivityDetail>,
    /// Athletes whose listing was fetched in full. A stored activity of one
    /// of these athletes that is missing from `activities` is gone upstream.
    pub athletes: BTreeSet<u64>,
}

/// Where activity data comes from.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Full detail for one activity, using the owner's credential.
    async fn fetch_activity(
        &self,
        athlete: &Athlete,
        activity_id: u64,
    ) -> Result<ActivityDetail, AppError>;

    /// Every activity of a team's athletes since `after`, restricted to
    /// known activity types. Athletes that could not be listed are left out
    /// of `TeamPull::athletes`.
    async fn list_team_activities(
        &self,
        team: &Team,
        after: DateTime<Utc>,
    ) -> Result<TeamPull, AppError>;

    /// Current member count of the team's club.
    async fn team_member_count(&self, team: &Team) -> Result<u32, AppError>;

    /// Drop any cached credential for a deauthorized athlete.
    fn forget_athlete(&self, _athlete_id: u64) {}
}
