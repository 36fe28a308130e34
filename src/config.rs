//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. The team roster comes from a JSON file
//! (`TEAMS_PATH`) or the built-in default.

use crate::models::team::{Roster, RosterError, Team};
use crate::models::week::{CalendarError, ChallengeCalendar};
use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, TimeZone, Utc};
use std::env;
use std::time::Duration;

/// Default challenge start: Monday, November 3, 2025 at 00:00 UTC.
pub const DEFAULT_CHALLENGE_START: &str = "2025-11-03T00:00:00Z";

/// Default upstream timeout for every Strava call.
pub const DEFAULT_STRAVA_TIMEOUT_SECS: u64 = 10;

/// Where documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                reason: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub storage_backend: StorageBackend,
    /// Bounded timeout for upstream calls
    pub strava_timeout: Duration,

    // --- Challenge ---
    pub calendar: ChallengeCalendar,
    pub roster: Roster,

    // --- Secrets ---
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Application refresh token for club queries
    pub strava_refresh_token: Option<String>,
    /// Webhook verification token
    pub webhook_verify_token: String,
    /// Bearer token for the sync trigger (open when unset)
    pub sync_secret_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let challenge_start = parse_challenge_start(
            &env::var("CHALLENGE_START").unwrap_or_else(|_| DEFAULT_CHALLENGE_START.to_string()),
        )?;

        let roster = match env::var("TEAMS_PATH") {
            Ok(path) => load_roster(&path)?,
            Err(_) => default_roster()?,
        };

        let strava_timeout_secs = match env::var("STRAVA_TIMEOUT_SECS") {
            Ok(v) => parse_timeout_secs(&v)?,
            Err(_) => DEFAULT_STRAVA_TIMEOUT_SECS,
        };

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            strava_timeout: Duration::from_secs(strava_timeout_secs),
            calendar: ChallengeCalendar::new(challenge_start)?,
            roster,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            strava_refresh_token: optional_secret("STRAVA_REFRESH_TOKEN"),
            webhook_verify_token: env::var("WEBHOOK_VERIFY_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WEBHOOK_VERIFY_TOKEN"))?,
            sync_secret_token: optional_secret("SYNC_SECRET_TOKEN"),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            strava_timeout: Duration::from_secs(2),
            calendar: Utc
                .with_ymd_and_hms(2025, 11, 3, 0, 0, 0)
                .single()
                .and_then(|start| ChallengeCalendar::new(start).ok())
                .expect("test challenge start is a Monday"),
            roster: Roster::new(vec![
                test_team("red", "Red Team", 101),
                test_team("blue", "Blue Team", 102),
                test_team("green", "Green Team", 103),
            ])
            .expect("test roster is valid"),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: None,
            webhook_verify_token: "test_verify_token".to_string(),
            sync_secret_token: Some("test_sync_token".to_string()),
        }
    }
}

fn test_team(id: &str, name: &str, club: u64) -> Team {
    Team {
        id: id.to_string(),
        name: name.to_string(),
        strava_club_id: club,
        strava_club_url: Some(format!("https://www.strava.com/clubs/{}", club)),
        avatar_url: None,
    }
}

fn optional_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timeout_secs(value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name: "STRAVA_TIMEOUT_SECS",
            reason: "must be at least 1 second".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(_) => Err(ConfigError::Invalid {
            name: "STRAVA_TIMEOUT_SECS",
            reason: format!("'{}' is not a number of seconds", value),
        }),
    }
}

fn parse_challenge_start(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    parse_utc_rfc3339(value).map_err(|e| ConfigError::Invalid {
        name: "CHALLENGE_START",
        reason: e.to_string(),
    })
}

/// Load and validate a roster from a JSON file.
pub fn load_roster(path: &str) -> Result<Roster, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Roster {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    parse_roster(&data).map_err(|e| match e {
        ConfigError::Roster { reason, .. } => ConfigError::Roster {
            path: path.to_string(),
            reason,
        },
        other => other,
    })
}

/// Parse and validate a roster from JSON text.
pub fn parse_roster(json: &str) -> Result<Roster, ConfigError> {
    let teams: Vec<Team> = serde_json::from_str(json).map_err(|e| ConfigError::Roster {
        path: "<inline>".to_string(),
        reason: e.to_string(),
    })?;
    Ok(Roster::new(teams)?)
}

/// The built-in single-team roster.
pub fn default_roster() -> Result<Roster, ConfigError> {
    Ok(Roster::new(vec![Team {
        id: "nutrend-test".to_string(),
        name: "Nutrend Test klub".to_string(),
        strava_club_id: 1831079,
        strava_club_url: Some("https://www.strava.com/clubs/1831079".to_string()),
        avatar_url: None,
    }])?)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to load roster from {path}: {reason}")]
    Roster { path: String, reason: String },

    #[error(transparent)]
    InvalidRoster(#[from] RosterError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}
