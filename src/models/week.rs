// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge week calendar.
//!
//! Weeks are never stored: week N is always derived from the challenge
//! start Monday and N alone.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::Serialize;

const WEEK_DAYS: i64 = 7;

/// Calendar errors
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Challenge start {0} is not a Monday at 00:00:00 UTC")]
    NotMondayMidnight(String),
}

/// Deterministic partition of time into 7-day windows from the challenge start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCalendar {
    start: DateTime<Utc>,
}

/// One week window. `end` is the last millisecond of Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub number: u32,
    /// Monday of the week as `YYYY-MM-DD`
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ChallengeCalendar {
    pub fn new(start: DateTime<Utc>) -> Result<Self, CalendarError> {
        let midnight = start.hour() == 0
            && start.minute() == 0
            && start.second() == 0
            && start.nanosecond() == 0;
        if start.weekday() != Weekday::Mon || !midnight {
            return Err(CalendarError::NotMondayMidnight(start.to_rfc3339()));
        }
        Ok(Self { start })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Week `number` (1-based). Week 0 is treated as week 1.
    pub fn week(&self, number: u32) -> Week {
        let number = number.max(1);
        let start = self.start + Duration::days(WEEK_DAYS * i64::from(number - 1));
        Week {
            number,
            id: start.format("%Y-%m-%d").to_string(),
            start,
            end: start + Duration::days(WEEK_DAYS) - Duration::milliseconds(1),
        }
    }

    /// Week number containing `instant`, or None before the challenge start.
    pub fn week_number_for(&self, instant: DateTime<Utc>) -> Option<u32> {
        if instant < self.start {
            return None;
        }
        let elapsed = instant - self.start;
        u32::try_from(elapsed.num_days() / WEEK_DAYS + 1).ok()
    }

    pub fn week_for(&self, instant: DateTime<Utc>) -> Option<Week> {
        self.week_number_for(instant).map(|n| self.week(n))
    }

    /// Every week from the challenge start through the week containing `now`.
    pub fn weeks_until(&self, now: DateTime<Utc>) -> Vec<Week> {
        match self.week_number_for(now) {
            Some(last) => (1..=last).map(|n| self.week(n)).collect(),
            None => Vec::new(),
        }
    }
}

impl Week {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Display label, e.g. "Week 1 (3.11. - 9.11.)".
    pub fn label(&self) -> String {
        format!(
            "Week {} ({}.{}. - {}.{}.)",
            self.number,
            self.start.day(),
            self.start.month(),
            self.end.day(),
            self.end.month()
        )
    }
}
