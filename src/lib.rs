// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Challenge leaderboard: team fitness challenge scoring and rankings
//!
//! This crate provides the backend for ingesting Strava activities,
//! scoring them, and keeping per-team overall and weekly leaderboards
//! consistent under webhook events and bulk resyncs.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use models::Roster;
use services::{ActivitySource, BulkResync, EventReconciler, KeyedLocks, ScoringRules};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub roster: Arc<Roster>,
    pub rules: ScoringRules,
    pub reconciler: EventReconciler,
    pub resync: BulkResync,
}

impl AppState {
    /// Wire the reconciler and resync around one store and source. Both
    /// share the per-team locks.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn ActivitySource>,
    ) -> Self {
        let roster = Arc::new(config.roster.clone());
        let locks = KeyedLocks::new();

        let reconciler = EventReconciler::new(
            store.clone(),
            source.clone(),
            roster.clone(),
            config.calendar,
            locks.clone(),
            config.strava_timeout,
        );
        let resync = BulkResync::new(
            store.clone(),
            source,
            roster.clone(),
            config.calendar,
            locks,
            config.strava_timeout,
        );

        Self {
            rules: ScoringRules::new(config.calendar.start()),
            config,
            store,
            roster,
            reconciler,
            resync,
        }
    }
}
