// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory cache of Strava access tokens.
//!
//! An explicit service object handed to the Strava collaborator. Entries
//! are only returned while they are valid for at least the refresh margin.

use crate::services::locks::KeyedLocks;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Whose token an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenOwner {
    /// Application-level token used for club queries
    App,
    Athlete(u64),
}

/// Cached access token with expiry information.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenCache {
    tokens: Arc<DashMap<TokenOwner, CachedToken>>,
    refresh_locks: KeyedLocks<TokenOwner>,
    margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Duration::seconds(TOKEN_REFRESH_MARGIN_SECS))
    }
}

impl TokenCache {
    pub fn new(margin: Duration) -> Self {
        Self {
            tokens: Arc::new(DashMap::new()),
            refresh_locks: KeyedLocks::new(),
            margin,
        }
    }

    /// Token for `owner` if it stays valid past `now + margin`.
    pub fn get_valid(&self, owner: TokenOwner, now: DateTime<Utc>) -> Option<String> {
        let cached = self.tokens.get(&owner)?;
        if now + self.margin < cached.expires_at {
            Some(cached.access_token.clone())
        } else {
            None
        }
    }

    /// Whether a token expiring at `expires_at` is still usable at `now`.
    pub fn is_fresh(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now + self.margin < expires_at
    }

    pub fn store(&self, owner: TokenOwner, access_token: String, expires_at: DateTime<Utc>) {
        self.tokens.insert(
            owner,
            CachedToken {
                access_token,
                expires_at,
            },
        );
    }

    pub fn invalidate(&self, owner: TokenOwner) {
        self.tokens.remove(&owner);
    }

    /// Serialize refreshes for one owner.
    pub async fn refresh_guard(&self, owner: TokenOwner) -> OwnedMutexGuard<()> {
        self.refresh_locks.lock(&owner).await
    }
}
