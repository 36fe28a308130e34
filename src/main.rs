// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge Leaderboard API Server
//!
//! Receives Strava webhook events, keeps team leaderboards up to date,
//! and serves the overall, weekly and athlete views.

use challenge_leaderboard::{
    config::{Config, StorageBackend},
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{StravaClient, StravaService, TokenCache},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        teams = config.roster.teams().len(),
        challenge_start = %config.calendar.start(),
        "Starting Challenge Leaderboard API"
    );

    let store: Arc<dyn DocumentStore> = match config.storage_backend {
        StorageBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.sync_secret_token.is_none() {
        tracing::warn!("SYNC_SECRET_TOKEN not set; /api/sync is open");
    }
    if config.strava_refresh_token.is_none() {
        tracing::info!("No application refresh token; member counts use registered athletes");
    }

    // Token cache shared by every Strava call in this instance
    let tokens = TokenCache::default();
    let client = StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
        config.strava_timeout,
    )?;
    let strava = StravaService::new(
        client,
        store.clone(),
        Arc::new(config.roster.clone()),
        tokens,
        config.strava_refresh_token.clone(),
    );

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, store, Arc::new(strava)));

    // Build router
    let app = challenge_leaderboard::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("challenge_leaderboard=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
