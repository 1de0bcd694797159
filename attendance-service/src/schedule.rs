//! Work schedule resolution.
//!
//! Answers, for an employee and a calendar date, whether the date is a work
//! day and which start/end times apply.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use error::{AppError, Result};

use crate::config::EngineConfig;
use crate::models::{DayOfWeek, DaySchedule, Employee};

/// Resolved schedule for one employee on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSchedule {
    pub is_work_day: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Resolves employee weekly schedules against calendar dates.
#[derive(Debug, Clone)]
pub struct ScheduleResolver {
    defaults: DaySchedule,
}

impl ScheduleResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            defaults: config.default_day_schedule(),
        }
    }

    /// Resolve the schedule for a calendar date.
    pub fn resolve(&self, employee: &Employee, date: NaiveDate) -> ResolvedSchedule {
        self.resolve_day(employee, DayOfWeek::from_date(date))
    }

    /// Resolve the schedule for a weekday tag.
    ///
    /// A scheduled day without a `work_schedule` entry falls back to the
    /// default times; the missing entry is not an error.
    pub fn resolve_day(&self, employee: &Employee, day: DayOfWeek) -> ResolvedSchedule {
        let times = employee
            .work_schedule
            .get(&day)
            .copied()
            .unwrap_or(self.defaults);

        ResolvedSchedule {
            is_work_day: employee.work_days.contains(&day),
            start: times.start,
            end: times.end,
        }
    }

    /// Number of scheduled work days in the half-open range `[start, end)`.
    pub fn work_days_in_range(&self, employee: &Employee, start: NaiveDate, end: NaiveDate) -> u32 {
        start
            .iter_days()
            .take_while(|d| *d < end)
            .filter(|d| employee.work_days.contains(&DayOfWeek::from_date(*d)))
            .count() as u32
    }
}

/// Half-open date range `[first of month, first of next month)`.
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidArgument(format!("invalid period {year}-{month:02}")))?;

    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::InvalidArgument(format!("invalid period {year}-{month:02}")))?;

    Ok((start, end))
}
