//! Deterministic environmental factors from the calendar and time of day.
//!
//! Weather and location are not sourced externally and stay neutral.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvironmentFactors {
    pub weather: f64,
    pub seasonal: f64,
    pub time_of_day: f64,
    pub location: f64,
}

impl EnvironmentFactors {
    /// Factors at `now`, shifted into local time by `utc_offset_minutes`.
    pub fn at(now: DateTime<Utc>, utc_offset_minutes: i32) -> Self {
        let local = now + Duration::minutes(i64::from(utc_offset_minutes));
        let seasonal = match local.month() {
            6..=8 => 1.3,  // monsoon
            9..=11 => 1.2, // leaf fall
            12 | 1 | 2 => 1.1,
            _ => 1.0,
        };
        let time_of_day = match local.hour() {
            7..=9 | 17..=19 => 1.1, // commute peaks
            _ => 1.0,
        };
        Self {
            weather: 1.0,
            seasonal,
            time_of_day,
            location: 1.0,
        }
    }

    /// Environmental score component, capped at `max`.
    pub fn score(&self, max: f64) -> f64 {
        ((self.seasonal - 1.0) * 10.0 + (self.time_of_day - 1.0) * 5.0).clamp(0.0, max)
    }
}
