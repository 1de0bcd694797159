//! Employee attendance and payroll engine.
//!
//! Staff check in and out (face-recognition capture happens upstream and
//! hands over an employee id); the engine classifies each event against the
//! employee's weekly schedule, applies lateness penalties, and aggregates
//! monthly salary figures into a recomputable ledger.

use std::sync::Arc;

pub mod config;
pub mod models;
pub mod payroll;
pub mod report;
pub mod repository;
pub mod schedule;
pub mod service;

pub use config::EngineConfig;
pub use error::{AppError, AttendanceError, ErrorResponse, PersistenceError};
pub use models::{
    Attendance, AttendanceStatus, CheckEventResponse, DayOfWeek, DaySchedule, DayScheduleView,
    Direction, Employee, MonthlySalary,
};
pub use payroll::{PayrollService, PeriodSummary};
pub use report::{DailyReport, MonthlyStat, ReportService};
pub use repository::{
    AttendanceRepository, EmployeeRepository, InMemoryAttendanceRepository,
    InMemoryEmployeeRepository, InMemorySalaryRepository, RepositoryError, SalaryRepository,
};
pub use schedule::{month_range, ResolvedSchedule, ScheduleResolver};
pub use service::AttendanceService;

/// The engine's services wired over one shared set of stores.
pub struct Engine {
    pub attendance: AttendanceService,
    pub payroll: PayrollService,
    pub reports: ReportService,
    /// Employee master data, managed by the surrounding admin layer.
    pub employees: Arc<InMemoryEmployeeRepository>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let employees = Arc::new(InMemoryEmployeeRepository::new());
        let events = Arc::new(InMemoryAttendanceRepository::new());
        let salaries = Arc::new(InMemorySalaryRepository::new());

        Self {
            attendance: AttendanceService::new(&config, employees.clone(), events.clone()),
            payroll: PayrollService::new(
                &config,
                employees.clone(),
                events.clone(),
                salaries,
            ),
            reports: ReportService::new(&config, employees.clone(), events),
            employees,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
