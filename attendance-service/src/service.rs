//! Attendance recording and classification.
//!
//! Converts raw check-in/check-out events into classified, persisted
//! attendance records.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use error::{AppError, AttendanceError, Result};

use crate::config::EngineConfig;
use crate::models::{
    Attendance, AttendanceStatus, CheckEventResponse, DayOfWeek, DayScheduleView, Direction,
    Employee,
};
use crate::repository::{
    AttendanceRepository, EmployeeRepository, InMemoryAttendanceRepository,
    InMemoryEmployeeRepository, RepositoryError,
};
use crate::schedule::{ResolvedSchedule, ScheduleResolver};

/// Attendance service for check-in/check-out operations.
pub struct AttendanceService {
    employees: Arc<InMemoryEmployeeRepository>,
    events: Arc<InMemoryAttendanceRepository>,
    resolver: ScheduleResolver,
}

impl AttendanceService {
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

    /// Record a check-in for an employee.
    ///
    /// A check-in on a non-work day still creates a record, classified as
    /// `day_off` with no penalty.
    pub async fn check_in(
        &self,
        employee_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Attendance> {
        let employee = self.require_employee(employee_id).await?;
        let schedule = self.resolver.resolve(&employee, date);

        let mut event = Attendance::new(&employee.id, date, time, Direction::In);
        classify_check_in(&employee, &schedule, &mut event);

        let stored = self.insert_event(&employee, event).await?;
        tracing::info!(
            "Check-in recorded for {} on {}: {:?} ({} late min, penalty {})",
            employee.id,
            date,
            stored.status,
            stored.late_minutes,
            stored.penalty_amount
        );
        Ok(stored)
    }

    /// Record a check-out for an employee.
    ///
    /// No lateness is computed on check-out; the call is only gated by the
    /// day's check-in existing.
    pub async fn check_out(
        &self,
        employee_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Attendance> {
        let employee = self.require_employee(employee_id).await?;

        let check_in = self
            .events
            .find_event(&employee.id, date, Direction::In)
            .await?;
        if check_in.is_none() {
            return Err(AppError::Attendance(AttendanceError::MissingCheckIn {
                employee_id: employee.id.clone(),
                date,
            }));
        }

        let event = Attendance::new(&employee.id, date, time, Direction::Out);
        let stored = self.insert_event(&employee, event).await?;
        tracing::info!("Check-out recorded for {} on {}", employee.id, date);
        Ok(stored)
    }

    /// Check in with the server wall clock.
    ///
    /// The calling layer passes only the employee id; client-supplied
    /// timestamps are never trusted.
    pub async fn check_in_now(&self, employee_id: &str) -> Result<CheckEventResponse> {
        let now = Local::now();
        let event = self.check_in(employee_id, now.date_naive(), now.time()).await?;
        let employee = self.require_employee(employee_id).await?;
        Ok(CheckEventResponse::for_event(&employee, &event))
    }

    /// Check out with the server wall clock.
    pub async fn check_out_now(&self, employee_id: &str) -> Result<CheckEventResponse> {
        let now = Local::now();
        let event = self.check_out(employee_id, now.date_naive(), now.time()).await?;
        let employee = self.require_employee(employee_id).await?;
        Ok(CheckEventResponse::for_event(&employee, &event))
    }

    /// Resolved schedule for one employee and date.
    pub async fn get_schedule(&self, employee_id: &str, date: NaiveDate) -> Result<ResolvedSchedule> {
        let employee = self.require_employee(employee_id).await?;
        Ok(self.resolver.resolve(&employee, date))
    }

    /// Full weekly schedule, one entry per weekday in calendar order.
    pub async fn weekly_schedule(&self, employee_id: &str) -> Result<Vec<DayScheduleView>> {
        let employee = self.require_employee(employee_id).await?;
        Ok(DayOfWeek::ALL
            .iter()
            .map(|day| {
                let resolved = self.resolver.resolve_day(&employee, *day);
                DayScheduleView {
                    day: *day,
                    start: resolved.start,
                    end: resolved.end,
                    is_work_day: resolved.is_work_day,
                }
            })
            .collect())
    }

    /// Re-run classification for a stored check-in against the employee's
    /// current schedule, overwriting status, late minutes and penalty.
    ///
    /// Check-out rows are returned unchanged.
    pub async fn reclassify(&self, attendance_id: i64) -> Result<Attendance> {
        let mut event = self
            .events
            .find_by_id(attendance_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("attendance record {attendance_id}")))?;

        if event.direction != Direction::In {
            return Ok(event);
        }

        let employee = self.require_employee(&event.employee_id).await?;
        let schedule = self.resolver.resolve(&employee, event.date);
        classify_check_in(&employee, &schedule, &mut event);

        let updated = self.events.update(&event).await?;
        tracing::debug!(
            "Reclassified attendance {} for {}: {:?}",
            attendance_id,
            employee.id,
            updated.status
        );
        Ok(updated)
    }

    async fn require_employee(&self, employee_id: &str) -> Result<Employee> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employee {employee_id}")))
    }

    /// Insert one event, turning the store's uniqueness violation into the
    /// domain duplicate error.
    async fn insert_event(&self, employee: &Employee, event: Attendance) -> Result<Attendance> {
        let direction = event.direction;
        let date = event.date;
        self.events.insert(&event).await.map_err(|e| match e {
            RepositoryError::DuplicateEntry(_) => {
                AppError::Attendance(AttendanceError::DuplicateEvent {
                    employee_id: employee.id.clone(),
                    date,
                    direction: direction.as_str().to_string(),
                })
            }
            other => other.into(),
        })
    }
}

/// Classify a check-in against the resolved schedule, filling status, late
/// minutes and penalty.
///
/// The grace boundary is inclusive: lateness of exactly
/// `allowed_late_minutes` is still on time.
fn classify_check_in(employee: &Employee, schedule: &ResolvedSchedule, event: &mut Attendance) {
    event.late_minutes = 0;
    event.penalty_amount = Decimal::ZERO;

    if !schedule.is_work_day {
        event.status = AttendanceStatus::DayOff;
        return;
    }

    let scheduled = event.date.and_time(schedule.start);
    let actual = event.date.and_time(event.time);

    if actual > scheduled {
        let raw_late = (actual - scheduled).num_minutes();
        let effective = (raw_late - i64::from(employee.allowed_late_minutes)).max(0) as u32;
        if effective > 0 {
            event.status = AttendanceStatus::Late;
            event.late_minutes = effective;
            event.penalty_amount = Decimal::from(effective) * employee.late_penalty_per_minute;
        } else {
            event.status = AttendanceStatus::Ontime;
        }
    } else if actual < scheduled {
        event.status = AttendanceStatus::Early;
    } else {
        event.status = AttendanceStatus::Ontime;
    }
}
