//! Saved workouts and the structured plan shape returned by generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Weekday keys expected in `weeklySchedule`.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Saved workout plan stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedWorkout {
    /// UUID (also used as document ID)
    pub id: String,
    /// User-editable title
    pub title: String,
    /// Serialized plan (usually JSON, sometimes markdown)
    pub content: String,
    /// Owner's normalized email
    pub user_email: String,
    /// Creation time (list ordering key)
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A single exercise in a day's routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: String,
    #[serde(default)]
    pub rest: String,
}

/// One day of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DayWorkout {
    pub focus: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub notes: String,
}

/// Structured workout plan as produced by the generation gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutPlan {
    pub title: String,
    pub overview: String,
    /// Keyed by weekday name
    pub weekly_schedule: BTreeMap<String, DayWorkout>,
    #[serde(default)]
    pub nutrition_tips: Vec<String>,
}

impl WorkoutPlan {
    /// Weekdays with no entry in the schedule (matched case-insensitively).
    pub fn missing_weekdays(&self) -> Vec<&'static str> {
        WEEKDAYS
            .iter()
            .copied()
            .filter(|day| {
                !self
                    .weekly_schedule
                    .keys()
                    .any(|key| key.trim().eq_ignore_ascii_case(day))
            })
            .collect()
    }

    /// Rewrite weekday keys to their canonical spelling ("monday " becomes "Monday").
    ///
    /// An exactly spelled key wins over a differently cased duplicate. Keys that
    /// are not weekdays are kept as they are.
    pub fn normalize_weekdays(&mut self) {
        let schedule = std::mem::take(&mut self.weekly_schedule);
        for (key, day) in schedule {
            match WEEKDAYS
                .iter()
                .find(|weekday| key.trim().eq_ignore_ascii_case(weekday))
            {
                Some(weekday) if key == *weekday => {
                    self.weekly_schedule.insert(key, day);
                }
                Some(weekday) => {
                    self.weekly_schedule
                        .entry(weekday.to_string())
                        .or_insert(day);
                }
                None => {
                    self.weekly_schedule.insert(key, day);
                }
            }
        }
    }
}
