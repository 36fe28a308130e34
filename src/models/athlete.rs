//! Athlete model for storage.

use serde::{Deserialize, Serialize};

/// Athlete profile and OAuth credential record stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    /// Strava athlete ID (also used as document ID)
    pub athlete_id: u64,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// Profile picture URL
    #[serde(default)]
    pub profile: Option<String>,
    /// Team assignment (None if unaffiliated)
    #[serde(default)]
    pub team_id: Option<String>,
    /// Strava club the athlete joined through
    #[serde(default)]
    pub strava_club_id: Option<u64>,
    /// OAuth access token
    pub access_token: String,
    /// OAuth refresh token
    pub refresh_token: String,
    /// When the access token expires (epoch seconds)
    pub expires_at: i64,
    /// When the athlete first connected
    #[serde(default)]
    pub created_at: String,
    /// Last credential update
    #[serde(default)]
    pub updated_at: String,
}

impl Athlete {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}
