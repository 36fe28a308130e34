// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fixed team roster.

use crate::models::Athlete;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// A configured team backed by a Strava club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub strava_club_id: u64,
    #[serde(default)]
    #[validate(url)]
    pub strava_club_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The ordered team roster. Configuration order is the tie-break order
/// for every ranking.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    teams: Vec<Team>,
}

/// Roster validation errors.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Roster has no teams")]
    Empty,

    #[error("Duplicate team id: {0}")]
    DuplicateId(String),

    #[error("Invalid team {id}: {source}")]
    InvalidTeam {
        id: String,
        source: validator::ValidationErrors,
    },
}

impl Roster {
    /// Build a validated roster.
    pub fn new(teams: Vec<Team>) -> Result<Self, RosterError> {
        if teams.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut seen = HashSet::new();
        for team in &teams {
            team.validate().map_err(|source| RosterError::InvalidTeam {
                id: team.id.clone(),
                source,
            })?;
            if !seen.insert(team.id.as_str()) {
                return Err(RosterError::DuplicateId(team.id.clone()));
            }
        }

        Ok(Self { teams })
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn get(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// Resolve the team an athlete's activities count for.
    ///
    /// A stored team id wins if it is configured; otherwise the athlete's
    /// club is matched against the roster.
    pub fn resolve_team(&self, athlete: &Athlete) -> Option<&Team> {
        if let Some(team) = athlete.team_id.as_deref().and_then(|id| self.get(id)) {
            return Some(team);
        }

        athlete
            .strava_club_id
            .and_then(|club| self.teams.iter().find(|t| t.strava_club_id == club))
    }
}
