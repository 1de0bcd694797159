//! Common error types for the attendance and payroll engine.
//!
//! This crate provides the unified error taxonomy shared by the engine's
//! services and the serializable error shape handed to API clients.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Attendance error: {0}")]
    Attendance(#[from] AttendanceError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Attendance-recording errors.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("check-{direction} already recorded for employee {employee_id} on {date}")]
    DuplicateEvent {
        employee_id: String,
        date: NaiveDate,
        direction: String,
    },

    #[error("no check-in recorded for employee {employee_id} on {date}")]
    MissingCheckIn {
        employee_id: String,
        date: NaiveDate,
    },
}

/// Persistence-layer errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Record not found")]
    NotFound,
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::Attendance(AttendanceError::DuplicateEvent { .. }) => "DUPLICATE_EVENT",
            AppError::Attendance(AttendanceError::MissingCheckIn { .. }) => "MISSING_CHECK_IN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL",
        };
        Self::new(code, err.to_string())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
