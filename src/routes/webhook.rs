// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::models::WebhookEvent;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: String,
    #[serde(rename = "hub.challenge")]
    challenge: String,
    #[serde(rename = "hub.verify_token")]
    verify_token: String,
}

/// Verification response.
#[derive(Serialize, Default)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    if params.mode == "subscribe" && params.verify_token == state.config.webhook_verify_token {
        tracing::info!("Webhook subscription verified");
        (
            StatusCode::OK,
            Json(VerifyResponse {
                challenge: params.challenge,
            }),
        )
    } else {
        tracing::warn!(
            mode = %params.mode,
            "Webhook verification failed: invalid token"
        );
        (StatusCode::FORBIDDEN, Json(VerifyResponse::default()))
    }
}

/// Handle incoming webhook events (POST).
///
/// Reconciliation runs inline. Retryable failures return 500 so Strava
/// redelivers; everything else is acknowledged with 200.
async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(
                error = %e,
                payload = %String::from_utf8_lossy(&body),
                "Failed to parse webhook event"
            );
            return StatusCode::OK; // Still return 200 to Strava to avoid retries
        }
    };

    tracing::info!(
        object_type = ?event.object_type,
        object_id = event.object_id,
        aspect_type = ?event.aspect_type,
        owner_id = event.owner_id,
        "Webhook event received"
    );

    match state.reconciler.handle_event(&event).await {
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_retryable() => {
            tracing::error!(
                error = %e,
                object_id = event.object_id,
                "Webhook event failed; requesting redelivery"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::error!(error = %e, object_id = event.object_id, "Webhook event dropped");
            StatusCode::OK
        }
    }
}
