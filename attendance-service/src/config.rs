//! Engine configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::DaySchedule;

/// Attendance engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fallback start time for scheduled days without an explicit entry
    pub default_day_start: NaiveTime,
    /// Fallback end time for scheduled days without an explicit entry
    pub default_day_end: NaiveTime,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            default_day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(start) = std::env::var("SCHEDULE_DEFAULT_START") {
            if let Ok(t) = NaiveTime::parse_from_str(&start, "%H:%M") {
                config.default_day_start = t;
            }
        }

        if let Ok(end) = std::env::var("SCHEDULE_DEFAULT_END") {
            if let Ok(t) = NaiveTime::parse_from_str(&end, "%H:%M") {
                config.default_day_end = t;
            }
        }

        config
    }

    /// Fallback day schedule assembled from the defaults.
    pub fn default_day_schedule(&self) -> DaySchedule {
        DaySchedule {
            start: self.default_day_start,
            end: self.default_day_end,
        }
    }
}
