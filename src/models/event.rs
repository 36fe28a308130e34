// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbound Strava webhook events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Activity,
    Athlete,
}

/// Visibility change carried by an activity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

/// Strava webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub object_type: ObjectType,
    pub object_id: u64,
    pub aspect_type: AspectType,
    pub owner_id: u64,
    #[serde(default)]
    pub event_time: i64,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    /// Changed fields, e.g. {"private": "true"} or {"authorized": "false"}
    #[serde(default)]
    pub updates: Option<HashMap<String, serde_json::Value>>,
}

impl WebhookEvent {
    /// Athlete update with `authorized: false`.
    pub fn is_deauthorization(&self) -> bool {
        self.object_type == ObjectType::Athlete
            && self.aspect_type == AspectType::Update
            && self
                .update_flag("authorized")
                .is_some_and(|authorized| !authorized)
    }

    /// Visibility change on an activity update, if any.
    pub fn visibility_change(&self) -> Option<Visibility> {
        self.update_flag("private").map(|private| {
            if private {
                Visibility::Private
            } else {
                Visibility::Public
            }
        })
    }

    /// Strava sends booleans in `updates` as strings; accept both forms.
    fn update_flag(&self, key: &str) -> Option<bool> {
        let value = self.updates.as_ref()?.get(key)?;
        if *value == true || *value == "true" {
            Some(true)
        } else if *value == false || *value == "false" {
            Some(false)
        } else {
            None
        }
    }
}
