//! Domain models for attendance and payroll.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weekday tag used in employee schedules.
///
/// Derived from the calendar through a fixed mapping, never from a
/// locale-dependent day name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All weekdays in calendar order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Weekday tag for a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

/// Scheduled start and end of one work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Employee master data and compensation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Identifier reported by the upstream capture component.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub department: String,
    /// Monthly base salary.
    pub monthly_salary: Decimal,
    /// Penalty charged per effective late minute.
    pub late_penalty_per_minute: Decimal,
    /// Minutes of lateness forgiven before any penalty accrues.
    pub allowed_late_minutes: u32,
    pub daily_work_hours: Decimal,
    /// Weekdays the employee is scheduled to work.
    pub work_days: HashSet<DayOfWeek>,
    /// Per-weekday start/end times. Days without an entry use the engine
    /// defaults, even when the day is in `work_days`.
    pub work_schedule: HashMap<DayOfWeek, DaySchedule>,
    /// Inactive employees disappear from reports; their history is kept.
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    /// Create a new employee with the standard compensation defaults.
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            position: String::new(),
            department: String::new(),
            monthly_salary: Decimal::ZERO,
            late_penalty_per_minute: Decimal::from(1000),
            allowed_late_minutes: 10,
            daily_work_hours: Decimal::from(8),
            work_days: HashSet::new(),
            work_schedule: HashMap::new(),
            is_active: true,
            created_at: None,
        }
    }

    /// Set the monthly base salary.
    pub fn with_monthly_salary(mut self, salary: Decimal) -> Self {
        self.monthly_salary = salary;
        self
    }

    /// Set the lateness penalty rate and grace period.
    pub fn with_penalty_policy(mut self, per_minute: Decimal, allowed_late_minutes: u32) -> Self {
        self.late_penalty_per_minute = per_minute;
        self.allowed_late_minutes = allowed_late_minutes;
        self
    }

    /// Set the scheduled weekdays.
    pub fn with_work_days(mut self, days: impl IntoIterator<Item = DayOfWeek>) -> Self {
        self.work_days = days.into_iter().collect();
        self
    }

    /// Set the start/end times for one weekday.
    pub fn with_day_schedule(mut self, day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> Self {
        self.work_schedule.insert(day, DaySchedule { start, end });
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Direction of an attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Classification of a check-in event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Ontime,
    Late,
    Early,
    /// Derived aggregate state; the classifier never writes it.
    Absent,
    DayOff,
}

/// One recorded check-in or check-out event.
///
/// At most one record exists per (employee, date, direction); the store
/// enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Option<i64>,
    pub employee_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub direction: Direction,
    pub status: AttendanceStatus,
    pub late_minutes: u32,
    pub penalty_amount: Decimal,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Attendance {
    /// Create a new unclassified event; the store assigns `id` and
    /// `created_at`.
    pub fn new(
        employee_id: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
        direction: Direction,
    ) -> Self {
        Self {
            id: None,
            employee_id: employee_id.into(),
            date,
            time,
            direction,
            status: AttendanceStatus::Ontime,
            late_minutes: 0,
            penalty_amount: Decimal::ZERO,
            notes: String::new(),
            created_at: None,
        }
    }
}

/// Materialized salary record for one employee and month.
///
/// Derived entirely from attendance rows and the employee configuration;
/// recomputable at any time. One record exists per (employee, year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySalary {
    pub id: Option<i64>,
    pub employee_id: String,
    pub year: i32,
    pub month: u32,
    pub basic_salary: Decimal,
    pub total_penalty: Decimal,
    /// Manually granted bonus; preserved across recomputes.
    pub total_bonus: Decimal,
    pub net_salary: Decimal,
    pub work_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub day_off_days: u32,
    pub is_paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonthlySalary {
    /// Create a zeroed record for a period, seeded with the employee's base
    /// salary.
    pub fn new(employee_id: impl Into<String>, year: i32, month: u32, basic_salary: Decimal) -> Self {
        Self {
            id: None,
            employee_id: employee_id.into(),
            year,
            month,
            basic_salary,
            total_penalty: Decimal::ZERO,
            total_bonus: Decimal::ZERO,
            net_salary: Decimal::ZERO,
            work_days: 0,
            present_days: 0,
            late_days: 0,
            absent_days: 0,
            day_off_days: 0,
            is_paid: false,
            paid_date: None,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Recompute `net_salary` from the current components, floored at zero.
    pub fn refresh_net(&mut self) {
        let net = self.basic_salary - self.total_penalty + self.total_bonus;
        self.net_salary = net.max(Decimal::ZERO);
    }
}

/// Outcome of a check-in or check-out, shaped for the calling layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckEventResponse {
    pub status: String,
    pub message: String,
    pub employee_name: String,
    pub time: String,
    pub direction: Direction,
    pub event_status: AttendanceStatus,
    pub is_work_day: bool,
    pub late_minutes: u32,
    pub penalty_amount: Decimal,
}

impl CheckEventResponse {
    /// Build the success payload for a recorded event.
    pub fn for_event(employee: &Employee, event: &Attendance) -> Self {
        let name = employee.full_name();
        let message = match (event.direction, event.status) {
            (Direction::In, AttendanceStatus::DayOff) => {
                format!("Check-in recorded for {name} (scheduled day off).")
            }
            (Direction::In, AttendanceStatus::Late) => format!(
                "Check-in recorded for {name} ({} minutes late, penalty {}).",
                event.late_minutes, event.penalty_amount
            ),
            (Direction::In, _) => format!("Check-in recorded for {name}."),
            (Direction::Out, _) => format!("Check-out recorded for {name}."),
        };

        Self {
            status: "success".to_string(),
            message,
            employee_name: name,
            time: event.time.format("%H:%M").to_string(),
            direction: event.direction,
            event_status: event.status,
            is_work_day: event.status != AttendanceStatus::DayOff,
            late_minutes: event.late_minutes,
            penalty_amount: event.penalty_amount,
        }
    }
}

/// Resolved schedule for one weekday, shaped for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayScheduleView {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_work_day: bool,
}
