// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Provides typed operations for:
//! - Athletes (profile and OAuth credentials)
//! - Activities (ingested Strava activities, stamped with their team)
//! - Team slices (overall and weekly aggregates)

use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::{Activity, Athlete, TeamStats, TeamWeekStats};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with a dummy token.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn get_doc<T>(&self, collection: &str, doc_id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_doc<T>(&self, collection: &str, doc_id: &str, doc: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Sync + Send,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── Athlete Operations ──────────────────────────────────────

    async fn get_athlete(&self, athlete_id: u64) -> Result<Option<Athlete>, AppError> {
        self.get_doc(collections::ATHLETES, &athlete_id.to_string())
            .await
    }

    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<(), AppError> {
        self.put_doc(
            collections::ATHLETES,
            &athlete.athlete_id.to_string(),
            athlete,
        )
        .await
    }

    async fn delete_athlete(&self, athlete_id: u64) -> Result<(), AppError> {
        self.delete_doc(collections::ATHLETES, &athlete_id.to_string())
            .await
    }

    async fn list_athletes(&self) -> Result<Vec<Athlete>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::ATHLETES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, &activity_id.to_string())
            .await
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.put_doc(
            collections::ACTIVITIES,
            &activity.activity_id.to_string(),
            activity,
        )
        .await
    }

    /// Check-then-write; callers hold the team lock for the activity.
    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<bool, AppError> {
        if self.get_activity(activity.activity_id).await?.is_some() {
            return Ok(false);
        }
        self.upsert_activity(activity).await?;
        Ok(true)
    }

    async fn delete_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        let existing = self.get_activity(activity_id).await?;
        if existing.is_some() {
            self.delete_doc(collections::ACTIVITIES, &activity_id.to_string())
                .await?;
        }
        Ok(existing)
    }

    async fn activities_for_team(&self, team_id: &str) -> Result<Vec<Activity>, AppError> {
        let team_id = team_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("team_id").eq(team_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn activities_for_athlete(&self, athlete_id: u64) -> Result<Vec<Activity>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([q.field("athlete_id").eq(athlete_id)]))
            .order_by([("start_date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Team Slice Operations ───────────────────────────────────

    async fn get_team_stats(&self, team_id: &str) -> Result<Option<TeamStats>, AppError> {
        self.get_doc(collections::TEAM_STATS, team_id).await
    }

    async fn put_team_stats(&self, stats: &TeamStats) -> Result<(), AppError> {
        self.put_doc(collections::TEAM_STATS, &stats.team_id, stats)
            .await
    }

    async fn list_team_stats(&self) -> Result<Vec<TeamStats>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::TEAM_STATS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_team_week(
        &self,
        week_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamWeekStats>, AppError> {
        self.get_doc(
            collections::TEAM_WEEKS,
            &TeamWeekStats::doc_id_for(week_id, team_id),
        )
        .await
    }

    async fn put_team_week(&self, stats: &TeamWeekStats) -> Result<(), AppError> {
        self.put_doc(collections::TEAM_WEEKS, &stats.doc_id(), stats)
            .await
    }

    async fn list_team_weeks(&self, week_id: &str) -> Result<Vec<TeamWeekStats>, AppError> {
        let week_id = week_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::TEAM_WEEKS)
            .filter(move |q| q.for_all([q.field("week_id").eq(week_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
