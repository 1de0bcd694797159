//! Monthly salary aggregation and the payroll ledger.
//!
//! The ledger owns the persisted per-employee-per-month records; every
//! recompute is a full replace of the derived fields, computed in memory
//! and written in one store operation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use error::{AppError, Result};

use crate::config::EngineConfig;
use crate::models::{Attendance, AttendanceStatus, Direction, Employee, MonthlySalary};
use crate::repository::{
    AttendanceRepository, EmployeeRepository, InMemoryAttendanceRepository,
    InMemoryEmployeeRepository, InMemorySalaryRepository, SalaryRepository,
};
use crate::schedule::{month_range, ScheduleResolver};

/// Derived monthly figures before they are merged into the stored record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonthlyTotals {
    pub work_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub early_days: u32,
    pub absent_days: u32,
    pub day_off_days: u32,
    pub late_penalty: Decimal,
    pub absent_penalty: Decimal,
}

/// Aggregate one employee's check-ins over the half-open range
/// `[start, end)`.
///
/// Rows are partitioned by the schedule's classification of each row's
/// date, not by the stored status, so the figures stay consistent after a
/// retroactive schedule edit. Day-off rows never contribute to
/// present/late/absent counts or to penalties.
pub(crate) fn aggregate_month(
    resolver: &ScheduleResolver,
    employee: &Employee,
    start: NaiveDate,
    end: NaiveDate,
    checkins: &[Attendance],
) -> MonthlyTotals {
    let work_days = resolver.work_days_in_range(employee, start, end);

    let mut present_dates: HashSet<NaiveDate> = HashSet::new();
    let mut day_off_dates: HashSet<NaiveDate> = HashSet::new();
    let mut late_days = 0u32;
    let mut early_days = 0u32;
    let mut late_penalty = Decimal::ZERO;

    for event in checkins {
        if resolver.resolve(employee, event.date).is_work_day {
            // Distinct dates guard against duplicates even though the store
            // forbids them.
            present_dates.insert(event.date);
            match event.status {
                AttendanceStatus::Late => {
                    late_days += 1;
                    late_penalty += event.penalty_amount;
                }
                AttendanceStatus::Early => early_days += 1,
                _ => {}
            }
        } else {
            day_off_dates.insert(event.date);
        }
    }

    let present_days = present_dates.len() as u32;
    let absent_days = absent_count(work_days, present_days);

    let daily_salary = if work_days > 0 {
        employee.monthly_salary / Decimal::from(work_days)
    } else {
        Decimal::ZERO
    };
    let absent_penalty = Decimal::from(absent_days) * daily_salary;

    MonthlyTotals {
        work_days,
        present_days,
        late_days,
        early_days,
        absent_days,
        day_off_days: day_off_dates.len() as u32,
        late_penalty,
        absent_penalty,
    }
}

/// Unattended work days, floored at zero.
fn absent_count(work_days: u32, present_days: u32) -> u32 {
    work_days.saturating_sub(present_days)
}

/// Period totals across all active employees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub year: i32,
    pub month: u32,
    pub total_net_salary: Decimal,
    pub total_penalty: Decimal,
    pub total_work_days: u32,
    pub total_present_days: u32,
    pub total_absent_days: u32,
    pub total_late_days: u32,
    pub total_day_off_days: u32,
    pub paid_count: u32,
    pub unpaid_count: u32,
    pub records: Vec<MonthlySalary>,
}

/// Payroll service owning the monthly salary ledger.
pub struct PayrollService {
    employees: Arc<InMemoryEmployeeRepository>,
    events: Arc<InMemoryAttendanceRepository>,
    salaries: Arc<InMemorySalaryRepository>,
    resolver: ScheduleResolver,
}

impl PayrollService {
    pub fn new(
        config: &EngineConfig,
        employees: Arc<InMemoryEmployeeRepository>,
        events: Arc<InMemoryAttendanceRepository>,
        salaries: Arc<InMemorySalaryRepository>,
    ) -> Self {
        Self {
            employees,
            events,
            salaries,
            resolver: ScheduleResolver::new(config),
        }
    }

    /// Fetch the period record, creating a zeroed one seeded with the
    /// employee's base salary when absent.
    pub async fn get_or_create(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySalary> {
        let employee = self.require_employee(employee_id).await?;
        month_range(year, month)?;
        let record = self
            .salaries
            .get_or_create(MonthlySalary::new(
                &employee.id,
                year,
                month,
                employee.monthly_salary,
            ))
            .await?;
        Ok(record)
    }

    /// Compute and persist the salary record for one employee and period.
    ///
    /// Full replace of the derived fields; `total_bonus`, payment state and
    /// notes are preserved. Idempotent for unchanged attendance data, and
    /// allowed even after the record was marked paid.
    pub async fn compute_month(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySalary> {
        let employee = self.require_employee(employee_id).await?;
        let (start, end) = month_range(year, month)?;

        let mut record = self.get_or_create(employee_id, year, month).await?;
        let checkins = self
            .events
            .find_in_range(&employee.id, start, end, Some(Direction::In))
            .await?;

        let totals = aggregate_month(&self.resolver, &employee, start, end, &checkins);

        record.basic_salary = employee.monthly_salary;
        record.work_days = totals.work_days;
        record.present_days = totals.present_days;
        record.late_days = totals.late_days;
        record.absent_days = totals.absent_days;
        record.day_off_days = totals.day_off_days;
        record.total_penalty = totals.late_penalty + totals.absent_penalty;
        record.refresh_net();

        let stored = self.salaries.update(&record).await?;
        tracing::info!(
            "Salary computed for {} {}-{:02}: {} work / {} present / {} late / {} absent, penalty {}, net {}",
            employee.id,
            year,
            month,
            stored.work_days,
            stored.present_days,
            stored.late_days,
            stored.absent_days,
            stored.total_penalty,
            stored.net_salary
        );
        Ok(stored)
    }

    /// Stored record for the period, computed on demand when missing or
    /// stale (never written, or zero present days against a non-empty
    /// schedule).
    pub async fn get_or_compute(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySalary> {
        let record = self.get_or_create(employee_id, year, month).await?;
        if record.updated_at.is_none() || (record.present_days == 0 && record.work_days > 0) {
            return self.compute_month(employee_id, year, month).await;
        }
        Ok(record)
    }

    /// Mark a salary record as paid, stamping the server date.
    pub async fn mark_paid(&self, salary_id: i64) -> Result<MonthlySalary> {
        let mut record = self
            .salaries
            .find_by_id(salary_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("salary record {salary_id}")))?;

        record.is_paid = true;
        record.paid_date = Some(Local::now().date_naive());
        let stored = self.salaries.update(&record).await?;
        tracing::info!(
            "Salary {} for {} {}-{:02} marked paid",
            salary_id,
            stored.employee_id,
            stored.year,
            stored.month
        );
        Ok(stored)
    }

    /// Record the manually granted bonus for a period and refresh the net.
    pub async fn set_bonus(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
        bonus: Decimal,
    ) -> Result<MonthlySalary> {
        if bonus < Decimal::ZERO {
            return Err(AppError::InvalidArgument(
                "bonus must not be negative".to_string(),
            ));
        }

        let mut record = self.get_or_create(employee_id, year, month).await?;
        record.total_bonus = bonus;
        record.refresh_net();
        let stored = self.salaries.update(&record).await?;
        Ok(stored)
    }

    /// Ledger rows and totals for every active employee in the period,
    /// computing stale rows on demand.
    pub async fn period_summary(&self, year: i32, month: u32) -> Result<PeriodSummary> {
        month_range(year, month)?;

        let mut summary = PeriodSummary {
            year,
            month,
            total_net_salary: Decimal::ZERO,
            total_penalty: Decimal::ZERO,
            total_work_days: 0,
            total_present_days: 0,
            total_absent_days: 0,
            total_late_days: 0,
            total_day_off_days: 0,
            paid_count: 0,
            unpaid_count: 0,
            records: Vec::new(),
        };

        for employee in self.employees.list_active().await? {
            let record = self.get_or_compute(&employee.id, year, month).await?;
            summary.total_net_salary += record.net_salary;
            summary.total_penalty += record.total_penalty;
            summary.total_work_days += record.work_days;
            summary.total_present_days += record.present_days;
            summary.total_absent_days += record.absent_days;
            summary.total_late_days += record.late_days;
            summary.total_day_off_days += record.day_off_days;
            if record.is_paid {
                summary.paid_count += 1;
            } else {
                summary.unpaid_count += 1;
            }
            summary.records.push(record);
        }

        Ok(summary)
    }

    async fn require_employee(&self, employee_id: &str) -> Result<Employee> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employee {employee_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    fn fixtures() -> (
        Arc<InMemoryEmployeeRepository>,
        Arc<InMemoryAttendanceRepository>,
        PayrollService,
    ) {
        let employees = Arc::new(InMemoryEmployeeRepository::new());
        let events = Arc::new(InMemoryAttendanceRepository::new());
        let salaries = Arc::new(InMemorySalaryRepository::new());
        let payroll = PayrollService::new(
            &EngineConfig::default(),
            employees.clone(),
            events.clone(),
            salaries,
        );
        (employees, events, payroll)
    }

    async fn weekday_employee(employees: &InMemoryEmployeeRepository) -> Employee {
        let employee = Employee::new("EMP001", "Aziz", "Karimov")
            .with_monthly_salary(dec!(5000000))
            .with_penalty_policy(dec!(1000), 10)
            .with_work_days([
                DayOfWeek::Monday,
                DayOfWeek::Tuesday,
                DayOfWeek::Wednesday,
                DayOfWeek::Thursday,
                DayOfWeek::Friday,
            ]);
        employees.insert(&employee).await.unwrap()
    }

    fn checkin(day: u32, status: AttendanceStatus, penalty: Decimal) -> Attendance {
        let mut event = Attendance::new(
            "EMP001",
            NaiveDate::from_ymd_opt(2021, 2, day).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            Direction::In,
        );
        event.status = status;
        event.penalty_amount = penalty;
        event
    }

    // February 2021 runs Monday to Sunday four times: 20 week days.
    const FEB_2021_WORK_DAYS: [u32; 20] = [
        1, 2, 3, 4, 5, 8, 9, 10, 11, 12, 15, 16, 17, 18, 19, 22, 23, 24, 25, 26,
    ];

    #[tokio::test]
    async fn test_compute_month_with_absences() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        // Present on the first 15 work days, on time.
        for day in &FEB_2021_WORK_DAYS[..15] {
            events
                .insert(&checkin(*day, AttendanceStatus::Ontime, Decimal::ZERO))
                .await
                .unwrap();
        }

        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert_eq!(record.work_days, 20);
        assert_eq!(record.present_days, 15);
        assert_eq!(record.absent_days, 5);
        assert_eq!(record.present_days + record.absent_days, record.work_days);
        // daily salary 250 000, absent penalty 1 250 000
        assert_eq!(record.total_penalty, dec!(1250000));
        assert_eq!(record.net_salary, dec!(3750000));
    }

    #[tokio::test]
    async fn test_compute_month_is_idempotent() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        events
            .insert(&checkin(1, AttendanceStatus::Late, dec!(7000)))
            .await
            .unwrap();
        events
            .insert(&checkin(2, AttendanceStatus::Ontime, Decimal::ZERO))
            .await
            .unwrap();

        let first = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        let second = payroll.compute_month("EMP001", 2021, 2).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.basic_salary, second.basic_salary);
        assert_eq!(first.total_penalty, second.total_penalty);
        assert_eq!(first.net_salary, second.net_salary);
        assert_eq!(first.work_days, second.work_days);
        assert_eq!(first.present_days, second.present_days);
        assert_eq!(first.late_days, second.late_days);
        assert_eq!(first.absent_days, second.absent_days);
        assert_eq!(first.day_off_days, second.day_off_days);
    }

    #[tokio::test]
    async fn test_day_off_rows_have_no_salary_effect() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        // Check-in on Saturday Feb 6, stored as day_off.
        events
            .insert(&checkin(6, AttendanceStatus::DayOff, Decimal::ZERO))
            .await
            .unwrap();

        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert_eq!(record.day_off_days, 1);
        assert_eq!(record.present_days, 0);
        assert_eq!(record.absent_days, 20);
        // The day-off visit earns nothing and costs nothing beyond the
        // ordinary absence accounting.
        assert_eq!(record.total_penalty, dec!(5000000));
        assert_eq!(record.net_salary, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_partition_follows_schedule_not_stored_status() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        // A row stamped day_off that sits on a Monday (e.g. classified
        // before the schedule gained Mondays) still counts as presence.
        events
            .insert(&checkin(1, AttendanceStatus::DayOff, Decimal::ZERO))
            .await
            .unwrap();

        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert_eq!(record.present_days, 1);
        assert_eq!(record.day_off_days, 0);
    }

    #[tokio::test]
    async fn test_bonus_preserved_across_recompute() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        for day in &FEB_2021_WORK_DAYS {
            events
                .insert(&checkin(*day, AttendanceStatus::Ontime, Decimal::ZERO))
                .await
                .unwrap();
        }

        payroll.set_bonus("EMP001", 2021, 2, dec!(200000)).await.unwrap();
        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert_eq!(record.total_bonus, dec!(200000));
        assert_eq!(record.net_salary, dec!(5200000));
    }

    #[tokio::test]
    async fn test_net_salary_never_negative() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;

        // One late day with a penalty dwarfing the salary.
        events
            .insert(&checkin(1, AttendanceStatus::Late, dec!(99000000)))
            .await
            .unwrap();

        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert!(record.total_penalty > record.basic_salary);
        assert_eq!(record.net_salary, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_mark_paid_and_recompute_still_allowed() {
        let (employees, events, payroll) = fixtures();
        weekday_employee(&employees).await;
        events
            .insert(&checkin(1, AttendanceStatus::Ontime, Decimal::ZERO))
            .await
            .unwrap();

        let record = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        let paid = payroll.mark_paid(record.id.unwrap()).await.unwrap();
        assert!(paid.is_paid);
        assert!(paid.paid_date.is_some());

        // Engine-level recompute remains possible; payment state survives.
        let recomputed = payroll.compute_month("EMP001", 2021, 2).await.unwrap();
        assert!(recomputed.is_paid);
    }

    #[tokio::test]
    async fn test_mark_paid_unknown_id() {
        let (_, _, payroll) = fixtures();
        let result = payroll.mark_paid(777).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_compute_month_rejects_invalid_period() {
        let (employees, _, payroll) = fixtures();
        weekday_employee(&employees).await;
        let result = payroll.compute_month("EMP001", 2021, 13).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_absent_count_floors_at_zero() {
        assert_eq!(absent_count(20, 15), 5);
        // present > work cannot arise from the schedule partition, but the
        // formula still floors rather than underflowing.
        assert_eq!(absent_count(3, 5), 0);
    }

    #[tokio::test]
    async fn test_empty_schedule_divides_safely() {
        let (employees, events, payroll) = fixtures();
        let employee = Employee::new("EMP009", "Nodira", "Islomova")
            .with_monthly_salary(dec!(3000000));
        employees.insert(&employee).await.unwrap();

        let mut event = Attendance::new(
            "EMP009",
            NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            Direction::In,
        );
        event.status = AttendanceStatus::DayOff;
        events.insert(&event).await.unwrap();

        let record = payroll.compute_month("EMP009", 2021, 2).await.unwrap();
        assert_eq!(record.work_days, 0);
        assert_eq!(record.absent_days, 0);
        assert_eq!(record.total_penalty, Decimal::ZERO);
        assert_eq!(record.net_salary, dec!(3000000));
        assert_eq!(record.day_off_days, 1);
    }
}
