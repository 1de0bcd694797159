//! Attendance reporting.
//!
//! Read-only aggregations consumed by the admin views. Absence is derived
//! here by comparing schedules against recorded check-ins; it is never
//! stored as an attendance row.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use error::Result;

use crate::config::EngineConfig;
use crate::models::{AttendanceStatus, Direction};
use crate::payroll::aggregate_month;
use crate::repository::{
    AttendanceRepository, EmployeeRepository, InMemoryAttendanceRepository,
    InMemoryEmployeeRepository,
};
use crate::schedule::{month_range, ScheduleResolver};

/// One day's attendance picture across active employees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_employees: u32,
    pub checkins: u32,
    pub checkouts: u32,
    pub ontime: u32,
    pub late: u32,
    pub early: u32,
    pub day_off: u32,
    /// Employees checked in but not yet out.
    pub still_working: Vec<String>,
    /// Employees scheduled to work today without a check-in. Derived, never
    /// stored.
    pub absent: Vec<String>,
}

/// Per-employee attendance statistics for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub employee_id: String,
    pub employee_name: String,
    pub work_days: u32,
    pub present_days: u32,
    pub absent_days: u32,
    pub late_days: u32,
    pub early_days: u32,
    pub day_off_days: u32,
    /// Present days as a percentage of scheduled work days.
    pub attendance_rate: f64,
}

/// Report service over the attendance store.
pub struct ReportService {
    employees: Arc<InMemoryEmployeeRepository>,
    events: Arc<InMemoryAttendanceRepository>,
    resolver: ScheduleResolver,
}

impl ReportService {
    pub fn new(
        config: &EngineConfig,
        employees: Arc<InMemoryEmployeeRepository>,
        events: Arc<InMemoryAttendanceRepository>,
    ) -> Self {
        Self {
            employees,
            events,
            resolver: ScheduleResolver::new(config),
        }
    }

    /// Attendance picture for one date.
    pub async fn daily_report(&self, date: NaiveDate) -> Result<DailyReport> {
        let employees = self.employees.list_active().await?;
        let events = self.events.find_by_date(date).await?;

        let mut checked_in: HashSet<&str> = HashSet::new();
        let mut checked_out: HashSet<&str> = HashSet::new();
        let mut report = DailyReport {
            date,
            total_employees: employees.len() as u32,
            checkins: 0,
            checkouts: 0,
            ontime: 0,
            late: 0,
            early: 0,
            day_off: 0,
            still_working: Vec::new(),
            absent: Vec::new(),
        };

        for event in &events {
            match event.direction {
                Direction::In => {
                    report.checkins += 1;
                    checked_in.insert(event.employee_id.as_str());
                    match event.status {
                        AttendanceStatus::Ontime => report.ontime += 1,
                        AttendanceStatus::Late => report.late += 1,
                        AttendanceStatus::Early => report.early += 1,
                        AttendanceStatus::DayOff => report.day_off += 1,
                        AttendanceStatus::Absent => {}
                    }
                }
                Direction::Out => {
                    report.checkouts += 1;
                    checked_out.insert(event.employee_id.as_str());
                }
            }
        }

        for employee in &employees {
            let has_checkin = checked_in.contains(employee.id.as_str());
            if has_checkin && !checked_out.contains(employee.id.as_str()) {
                report.still_working.push(employee.id.clone());
            }
            if !has_checkin && self.resolver.resolve(employee, date).is_work_day {
                report.absent.push(employee.id.clone());
            }
        }
        report.still_working.sort();
        report.absent.sort();

        Ok(report)
    }

    /// Per-employee statistics for one month, active employees only.
    pub async fn monthly_report(&self, year: i32, month: u32) -> Result<Vec<MonthlyStat>> {
        let (start, end) = month_range(year, month)?;
        let mut stats = Vec::new();

        for employee in self.employees.list_active().await? {
            let checkins = self
                .events
                .find_in_range(&employee.id, start, end, Some(Direction::In))
                .await?;
            let totals = aggregate_month(&self.resolver, &employee, start, end, &checkins);

            let attendance_rate = if totals.work_days > 0 {
                f64::from(totals.present_days) / f64::from(totals.work_days) * 100.0
            } else {
                0.0
            };

            stats.push(MonthlyStat {
                employee_id: employee.id.clone(),
                employee_name: employee.full_name(),
                work_days: totals.work_days,
                present_days: totals.present_days,
                absent_days: totals.absent_days,
                late_days: totals.late_days,
                early_days: totals.early_days,
                day_off_days: totals.day_off_days,
                attendance_rate,
            });
        }

        Ok(stats)
    }
}
