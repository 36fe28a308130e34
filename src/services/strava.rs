// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities and club data.
//!
//! Handles:
//! - Activity detail and athlete activity listing
//! - Club member counts
//! - Token refresh when expired
//! - Rate limit and timeout detection (surfaced as retryable errors)

use crate::error::AppError;
use crate::models::ActivityDetail;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials and a request timeout.
    pub fn new(
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: "https://www.strava.com/api/v3".to_string(),
            client_id,
            client_secret,
        })
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<StravaActivity, AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        self.get_json(&url, access_token).await
    }

    /// List the authenticated athlete's activities (paginated).
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64, // Unix timestamp
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        self.check_response_json(response).await
    }

    /// Get a club (for its member count).
    pub async fn get_club(&self, access_token: &str, club_id: u64) -> Result<StravaClub, AppError> {
        let url = format!("{}/clubs/{}", self.base_url, club_id);
        self.get_json(&url, access_token).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post("https://www.strava.com/oauth/token")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        self.check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => {
                    tracing::warn!("Strava rate limit hit (429)");
                    AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string())
                }
                401 => AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string()),
                404 => AppError::NotFound(format!("Strava resource: {}", body)),
                _ => AppError::StravaApi(format!("HTTP {}: {}", status, body)),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(e.to_string())
            } else {
                AppError::StravaApi(format!("JSON parse error: {}", e))
            }
        })
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(format!("Strava request timed out: {}", e))
    } else {
        AppError::StravaApi(e.to_string())
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Activity as returned by the detail and list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Legacy activity type
    #[serde(default, rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub utc_offset: f64,
    #[serde(default)]
    pub moving_time: i64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub athlete: Option<StravaAthleteRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthleteRef {
    pub id: u64,
}

impl StravaActivity {
    /// Prefer the finer-grained sport type, falling back to the legacy type.
    pub fn category(&self) -> &str {
        if self.sport_type.is_empty() {
            &self.activity_type
        } else {
            &self.sport_type
        }
    }

    pub fn into_detail(self, owner_id: u64) -> ActivityDetail {
        let sport_type = self.category().to_string();
        ActivityDetail {
            activity_id: self.id,
            athlete_id: self.athlete.map(|a| a.id).unwrap_or(owner_id),
            sport_type,
            start_date: self.start_date,
            utc_offset_secs: self.utc_offset as i32,
            moving_time: self.moving_time,
            distance: self.distance,
            calories: self.calories,
            name: self.name,
        }
    }
}

/// Club summary.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaClub {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::DocumentStore;
use crate::models::{Athlete, Roster, Team};
use crate::services::scoring::is_known_type;
use crate::services::source::{ActivitySource, TeamPull};
use crate::services::token_cache::{TokenCache, TokenOwner};
use async_trait::async_trait;
use std::sync::Arc;

/// Page size for activity listing (Strava maximum).
const ACTIVITIES_PER_PAGE: u32 = 200;
/// Upper bound on pages fetched per athlete.
const MAX_ACTIVITY_PAGES: u32 = 50;

/// High-level Strava service that manages token lifecycle and API calls.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    store: Arc<dyn DocumentStore>,
    roster: Arc<Roster>,
    tokens: TokenCache,
    /// Application refresh token for club queries
    app_refresh_token: Option<String>,
}

impl StravaService {
    pub fn new(
        client: StravaClient,
        store: Arc<dyn DocumentStore>,
        roster: Arc<Roster>,
        tokens: TokenCache,
        app_refresh_token: Option<String>,
    ) -> Self {
        Self {
            client,
            store,
            roster,
            tokens,
            app_refresh_token,
        }
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a valid access token for an athlete, refreshing and persisting
    /// the stored credential when it is about to expire.
    pub async fn athlete_access_token(&self, athlete: &Athlete) -> Result<String, AppError> {
        let athlete_id = athlete.athlete_id;
        let owner = TokenOwner::Athlete(athlete_id);
        let now = Utc::now();

        if let Some(token) = self.tokens.get_valid(owner, now) {
            return Ok(token);
        }

        let _guard = self.tokens.refresh_guard(owner).await;

        // Another task may have refreshed while we waited
        if let Some(token) = self.tokens.get_valid(owner, now) {
            return Ok(token);
        }

        // Re-read the stored credential; it may be newer than the caller's copy
        let mut stored = self
            .store
            .get_athlete(athlete_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Athlete {}", athlete_id)))?;

        let expires_at = DateTime::from_timestamp(stored.expires_at, 0).unwrap_or_default();
        if self.tokens.is_fresh(expires_at, now) {
            self.tokens
                .store(owner, stored.access_token.clone(), expires_at);
            return Ok(stored.access_token);
        }

        tracing::info!(athlete_id, "Access token expired, refreshing");

        let refreshed = self.client.refresh_token(&stored.refresh_token).await?;
        let new_expires_at = DateTime::from_timestamp(refreshed.expires_at, 0).unwrap_or_default();

        stored.access_token = refreshed.access_token.clone();
        stored.refresh_token = refreshed.refresh_token;
        stored.expires_at = refreshed.expires_at;
        stored.updated_at = Utc::now().to_rfc3339();
        self.store.upsert_athlete(&stored).await?;

        self.tokens
            .store(owner, refreshed.access_token.clone(), new_expires_at);

        tracing::info!(athlete_id, "Token refreshed and cached");
        Ok(refreshed.access_token)
    }

    /// Application token for club queries, if an application credential is configured.
    async fn app_access_token(&self) -> Result<Option<String>, AppError> {
        let Some(refresh_token) = self.app_refresh_token.as_deref() else {
            return Ok(None);
        };
        let now = Utc::now();

        if let Some(token) = self.tokens.get_valid(TokenOwner::App, now) {
            return Ok(Some(token));
        }

        let _guard = self.tokens.refresh_guard(TokenOwner::App).await;
        if let Some(token) = self.tokens.get_valid(TokenOwner::App, now) {
            return Ok(Some(token));
        }

        let refreshed = self.client.refresh_token(refresh_token).await?;
        let expires_at = DateTime::from_timestamp(refreshed.expires_at, 0).unwrap_or_default();
        self.tokens
            .store(TokenOwner::App, refreshed.access_token.clone(), expires_at);

        tracing::info!("Application token refreshed and cached");
        Ok(Some(refreshed.access_token))
    }

    /// Athletes whose activities count for `team`.
    async fn team_athletes(&self, team: &Team) -> Result<Vec<Athlete>, AppError> {
        Ok(self
            .store
            .list_athletes()
            .await?
            .into_iter()
            .filter(|a| {
                self.roster
                    .resolve_team(a)
                    .is_some_and(|resolved| resolved.id == team.id)
            })
            .collect())
    }

    async fn list_athlete_activities(
        &self,
        athlete: &Athlete,
        after: DateTime<Utc>,
    ) -> Result<Vec<ActivityDetail>, AppError> {
        let access_token = self.athlete_access_token(athlete).await?;
        let mut details = Vec::new();

        for page in 1..=MAX_ACTIVITY_PAGES {
            let batch = self
                .client
                .list_activities(&access_token, after.timestamp(), page, ACTIVITIES_PER_PAGE)
                .await?;
            let fetched = batch.len();

            details.extend(
                batch
                    .into_iter()
                    .filter(|a| is_known_type(a.category()))
                    .map(|a| a.into_detail(athlete.athlete_id)),
            );

            if fetched < ACTIVITIES_PER_PAGE as usize {
                break;
            }
        }

        Ok(details)
    }
}

#[async_trait]
impl ActivitySource for StravaService {
    async fn fetch_activity(
        &self,
        athlete: &Athlete,
        activity_id: u64,
    ) -> Result<ActivityDetail, AppError> {
        let access_token = self.athlete_access_token(athlete).await?;
        let activity = self.client.get_activity(&access_token, activity_id).await?;
        Ok(activity.into_detail(athlete.athlete_id))
    }

    async fn list_team_activities(
        &self,
        team: &Team,
        after: DateTime<Utc>,
    ) -> Result<TeamPull, AppError> {
        let mut pull = TeamPull::default();

        for athlete in self.team_athletes(team).await? {
            match self.list_athlete_activities(&athlete, after).await {
                Ok(mut activities) => {
                    pull.activities.append(&mut activities);
                    pull.athletes.insert(athlete.athlete_id);
                }
                Err(e) if e.is_strava_token_error() || matches!(e, AppError::NotFound(_)) => {
                    tracing::warn!(
                        athlete_id = athlete.athlete_id,
                        team_id = %team.id,
                        error = %e,
                        "Skipping athlete without usable Strava access"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        pull.activities.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.activity_id.cmp(&b.activity_id))
        });
        Ok(pull)
    }

    async fn team_member_count(&self, team: &Team) -> Result<u32, AppError> {
        match self.app_access_token().await? {
            Some(token) => Ok(self
                .client
                .get_club(&token, team.strava_club_id)
                .await?
                .member_count),
            None => Ok(self.team_athletes(team).await?.len() as u32),
        }
    }

    fn forget_athlete(&self, athlete_id: u64) {
        self.tokens.invalidate(TokenOwner::Athlete(athlete_id));
    }
}
