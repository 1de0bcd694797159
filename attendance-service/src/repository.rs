//! Stores for employees, attendance events and salary records.
//!
//! The in-memory implementations run their uniqueness checks and inserts
//! under one write lock, so a constraint violation can never race past a
//! concurrent insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use error::{AppError, PersistenceError};

use crate::models::{Attendance, Direction, Employee, MonthlySalary};

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => AppError::Persistence(PersistenceError::NotFound),
            RepositoryError::DuplicateEntry(msg) => {
                AppError::Persistence(PersistenceError::ConstraintViolation(msg))
            }
            RepositoryError::Storage(msg) => {
                AppError::Persistence(PersistenceError::Unavailable(msg))
            }
        }
    }
}

/// Employee master-data store.
#[allow(async_fn_in_trait)]
pub trait EmployeeRepository: Send + Sync {
    /// Insert a new employee; fails with `DuplicateEntry` when the id is
    /// already registered.
    async fn insert(&self, employee: &Employee) -> Result<Employee, RepositoryError>;

    /// Replace an existing employee's data.
    async fn update(&self, employee: &Employee) -> Result<Employee, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Employee>, RepositoryError>;

    /// All active employees, ordered by id.
    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError>;

    /// Soft-disable; attendance history stays intact.
    async fn deactivate(&self, id: &str) -> Result<Employee, RepositoryError>;
}

/// Attendance event store; unique on (employee, date, direction).
#[allow(async_fn_in_trait)]
pub trait AttendanceRepository: Send + Sync {
    /// Insert one event; fails with `DuplicateEntry` when a same-direction
    /// event already exists for the employee and date.
    async fn insert(&self, event: &Attendance) -> Result<Attendance, RepositoryError>;

    /// Overwrite the classification fields of a stored event.
    async fn update(&self, event: &Attendance) -> Result<Attendance, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Attendance>, RepositoryError>;

    async fn find_event(
        &self,
        employee_id: &str,
        date: NaiveDate,
        direction: Direction,
    ) -> Result<Option<Attendance>, RepositoryError>;

    /// Events for one employee in the half-open range `[start, end)`,
    /// optionally filtered by direction.
    async fn find_in_range(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        direction: Option<Direction>,
    ) -> Result<Vec<Attendance>, RepositoryError>;

    /// All events on one date, across employees.
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Attendance>, RepositoryError>;
}

/// Salary record store; unique on (employee, year, month).
#[allow(async_fn_in_trait)]
pub trait SalaryRepository: Send + Sync {
    /// Fetch the record for `seed`'s period, inserting `seed` if absent.
    /// Atomic: concurrent callers observe exactly one row per period.
    async fn get_or_create(&self, seed: MonthlySalary) -> Result<MonthlySalary, RepositoryError>;

    /// Replace a stored record; the full set of derived fields is written
    /// in one step.
    async fn update(&self, record: &MonthlySalary) -> Result<MonthlySalary, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<MonthlySalary>, RepositoryError>;

    async fn find_period(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<MonthlySalary>, RepositoryError>;
}

/// In-memory employee store for testing and development.
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

impl InMemoryEmployeeRepository {
    pub fn new() -> Self {
        Self {
            employees: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEmployeeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn insert(&self, employee: &Employee) -> Result<Employee, RepositoryError> {
        let mut employees = self.employees.write().unwrap();
        if employees.contains_key(&employee.id) {
            return Err(RepositoryError::DuplicateEntry(format!(
                "employee {}",
                employee.id
            )));
        }
        let mut stored = employee.clone();
        stored.created_at = Some(Utc::now());
        employees.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, employee: &Employee) -> Result<Employee, RepositoryError> {
        let mut employees = self.employees.write().unwrap();
        match employees.get_mut(&employee.id) {
            Some(existing) => {
                let mut updated = employee.clone();
                updated.created_at = existing.created_at;
                *existing = updated.clone();
                Ok(updated)
            }
            None => Err(RepositoryError::NotFound(format!(
                "employee {}",
                employee.id
            ))),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().unwrap();
        Ok(employees.get(id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().unwrap();
        let mut active: Vec<Employee> = employees
            .values()
            .filter(|e| e.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn deactivate(&self, id: &str) -> Result<Employee, RepositoryError> {
        let mut employees = self.employees.write().unwrap();
        match employees.get_mut(id) {
            Some(existing) => {
                existing.is_active = false;
                Ok(existing.clone())
            }
            None => Err(RepositoryError::NotFound(format!("employee {id}"))),
        }
    }
}

/// In-memory attendance store for testing and development.
pub struct InMemoryAttendanceRepository {
    events: RwLock<Vec<Attendance>>,
    next_id: AtomicI64,
}

impl InMemoryAttendanceRepository {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryAttendanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceRepository for InMemoryAttendanceRepository {
    async fn insert(&self, event: &Attendance) -> Result<Attendance, RepositoryError> {
        let mut events = self.events.write().unwrap();
        let duplicate = events.iter().any(|e| {
            e.employee_id == event.employee_id
                && e.date == event.date
                && e.direction == event.direction
        });
        if duplicate {
            return Err(RepositoryError::DuplicateEntry(format!(
                "attendance {} {} {}",
                event.employee_id,
                event.date,
                event.direction.as_str()
            )));
        }

        let mut stored = event.clone();
        stored.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
        stored.created_at = Some(Utc::now());
        events.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, event: &Attendance) -> Result<Attendance, RepositoryError> {
        let mut events = self.events.write().unwrap();
        if let Some(id) = event.id {
            if let Some(existing) = events.iter_mut().find(|e| e.id == Some(id)) {
                existing.status = event.status;
                existing.late_minutes = event.late_minutes;
                existing.penalty_amount = event.penalty_amount;
                existing.notes = event.notes.clone();
                return Ok(existing.clone());
            }
        }
        Err(RepositoryError::NotFound(format!(
            "attendance record {:?}",
            event.id
        )))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Attendance>, RepositoryError> {
        let events = self.events.read().unwrap();
        Ok(events.iter().find(|e| e.id == Some(id)).cloned())
    }

    async fn find_event(
        &self,
        employee_id: &str,
        date: NaiveDate,
        direction: Direction,
    ) -> Result<Option<Attendance>, RepositoryError> {
        let events = self.events.read().unwrap();
        Ok(events
            .iter()
            .find(|e| e.employee_id == employee_id && e.date == date && e.direction == direction)
            .cloned())
    }

    async fn find_in_range(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        direction: Option<Direction>,
    ) -> Result<Vec<Attendance>, RepositoryError> {
        let events = self.events.read().unwrap();
        let mut matching: Vec<Attendance> = events
            .iter()
            .filter(|e| {
                e.employee_id == employee_id
                    && e.date >= start
                    && e.date < end
                    && direction.map_or(true, |d| e.direction == d)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(matching)
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Attendance>, RepositoryError> {
        let events = self.events.read().unwrap();
        let mut matching: Vec<Attendance> =
            events.iter().filter(|e| e.date == date).cloned().collect();
        matching.sort_by(|a, b| a.employee_id.cmp(&b.employee_id).then(a.time.cmp(&b.time)));
        Ok(matching)
    }
}

/// In-memory salary store for testing and development.
pub struct InMemorySalaryRepository {
    records: RwLock<Vec<MonthlySalary>>,
    next_id: AtomicI64,
}

impl InMemorySalaryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemorySalaryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SalaryRepository for InMemorySalaryRepository {
    async fn get_or_create(&self, seed: MonthlySalary) -> Result<MonthlySalary, RepositoryError> {
        let mut records = self.records.write().unwrap();
        if let Some(existing) = records.iter().find(|r| {
            r.employee_id == seed.employee_id && r.year == seed.year && r.month == seed.month
        }) {
            return Ok(existing.clone());
        }

        let mut stored = seed;
        stored.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
        stored.created_at = Some(Utc::now());
        stored.updated_at = None;
        records.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &MonthlySalary) -> Result<MonthlySalary, RepositoryError> {
        let mut records = self.records.write().unwrap();
        let id = record
            .id
            .ok_or_else(|| RepositoryError::NotFound("salary record without id".to_string()))?;

        match records.iter_mut().find(|r| r.id == Some(id)) {
            Some(existing) => {
                let mut updated = record.clone();
                updated.created_at = existing.created_at;
                updated.updated_at = Some(Utc::now());
                *existing = updated.clone();
                Ok(updated)
            }
            None => Err(RepositoryError::NotFound(format!("salary record {id}"))),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<MonthlySalary>, RepositoryError> {
        let records = self.records.read().unwrap();
        Ok(records.iter().find(|r| r.id == Some(id)).cloned())
    }

    async fn find_period(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<MonthlySalary>, RepositoryError> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|r| r.employee_id == employee_id && r.year == year && r.month == month)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;

    fn event(employee_id: &str, day: u32, direction: Direction) -> Attendance {
        Attendance::new(
            employee_id,
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            direction,
        )
    }

    #[tokio::test]
    async fn test_attendance_insert_rejects_duplicate() {
        let repo = InMemoryAttendanceRepository::new();
        repo.insert(&event("EMP001", 15, Direction::In)).await.unwrap();

        let result = repo.insert(&event("EMP001", 15, Direction::In)).await;
        assert!(matches!(result, Err(RepositoryError::DuplicateEntry(_))));

        // The failed insert must not leave a row behind.
        let stored = repo
            .find_in_range(
                "EMP001",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_attendance_same_date_other_direction_allowed() {
        let repo = InMemoryAttendanceRepository::new();
        repo.insert(&event("EMP001", 15, Direction::In)).await.unwrap();
        repo.insert(&event("EMP001", 15, Direction::Out)).await.unwrap();

        let found = repo
            .find_event(
                "EMP001",
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                Direction::Out,
            )
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_attendance_range_is_half_open() {
        let repo = InMemoryAttendanceRepository::new();
        repo.insert(&event("EMP001", 31, Direction::In)).await.unwrap();
        let feb_first = Attendance::new(
            "EMP001",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            Direction::In,
        );
        repo.insert(&feb_first).await.unwrap();

        let january = repo
            .find_in_range(
                "EMP001",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                Some(Direction::In),
            )
            .await
            .unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[tokio::test]
    async fn test_attendance_update_overwrites_classification() {
        let repo = InMemoryAttendanceRepository::new();
        let stored = repo.insert(&event("EMP001", 15, Direction::In)).await.unwrap();

        let mut changed = stored.clone();
        changed.status = AttendanceStatus::Late;
        changed.late_minutes = 7;
        changed.penalty_amount = Decimal::from(7000);
        let updated = repo.update(&changed).await.unwrap();

        assert_eq!(updated.status, AttendanceStatus::Late);
        assert_eq!(updated.late_minutes, 7);
    }

    #[tokio::test]
    async fn test_salary_get_or_create_is_idempotent() {
        let repo = InMemorySalaryRepository::new();
        let first = repo
            .get_or_create(MonthlySalary::new("EMP001", 2024, 1, Decimal::from(1000)))
            .await
            .unwrap();
        let second = repo
            .get_or_create(MonthlySalary::new("EMP001", 2024, 1, Decimal::from(9999)))
            .await
            .unwrap();

        // The second call returns the existing row, not a fresh seed.
        assert_eq!(first.id, second.id);
        assert_eq!(second.basic_salary, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_employee_insert_and_deactivate() {
        let repo = InMemoryEmployeeRepository::new();
        repo.insert(&Employee::new("EMP001", "Aziz", "Karimov")).await.unwrap();
        repo.insert(&Employee::new("EMP002", "Malika", "Yusupova")).await.unwrap();

        assert_eq!(repo.list_active().await.unwrap().len(), 2);

        repo.deactivate("EMP002").await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "EMP001");

        // History-preserving: the record itself remains readable.
        assert!(repo.find_by_id("EMP002").await.unwrap().is_some());
    }
}
