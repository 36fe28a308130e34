// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod leaderboard;
pub mod locks;
pub mod reconcile;
pub mod resync;
pub mod scoring;
pub mod source;
pub mod strava;
pub mod token_cache;

pub use locks::KeyedLocks;
pub use reconcile::{EventReconciler, ReconcileOutcome, SkipReason};
pub use resync::{BulkResync, ResyncReport};
pub use scoring::{Score, ScoringRules};
pub use source::{ActivitySource, TeamPull};
pub use strava::{StravaClient, StravaService};
pub use token_cache::{TokenCache, TokenOwner};
