// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only leaderboard API.

use crate::error::Result;
use crate::models::{AthleteStats, OverallStats, WeeklyStats};
use crate::services::leaderboard::{load_athlete, load_overall, load_weekly};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public leaderboard routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/teams", get(get_teams))
        .route("/api/weekly", get(get_weekly))
        .route("/api/athletes/{athlete_id}", get(get_athlete))
}

/// Overall standings.
async fn get_teams(State(state): State<Arc<AppState>>) -> Result<Json<OverallStats>> {
    let overall = load_overall(state.store.as_ref(), &state.roster, Utc::now()).await?;
    Ok(Json(overall))
}

// ─── Weekly ──────────────────────────────────────────────────

/// Every challenge week so far.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyResponse {
    pub weeks: Vec<WeeklyStats>,
}

async fn get_weekly(State(state): State<Arc<AppState>>) -> Result<Json<WeeklyResponse>> {
    let weeks = load_weekly(
        state.store.as_ref(),
        &state.roster,
        &state.config.calendar,
        Utc::now(),
    )
    .await?;
    Ok(Json(WeeklyResponse { weeks }))
}

// ─── Athletes ────────────────────────────────────────────────

async fn get_athlete(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<u64>,
) -> Result<Json<AthleteStats>> {
    let stats = load_athlete(state.store.as_ref(), &state.roster, &state.rules, athlete_id).await?;
    Ok(Json(stats))
}
