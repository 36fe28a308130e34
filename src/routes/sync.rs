// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk resync trigger.

use crate::error::Result;
use crate::services::ResyncReport;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

/// Sync routes. The bearer guard is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/sync", post(run_sync))
}

async fn run_sync(State(state): State<Arc<AppState>>) -> Result<Json<ResyncReport>> {
    tracing::info!("Resync requested");
    let report = state.resync.run().await?;
    Ok(Json(report))
}
