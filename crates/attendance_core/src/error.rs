//! crates/attendance_core/src/error.rs
//!
//! The error type returned by the attendance, leave, directory and chat services.

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::domain::LeaveType;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Employee {0} not found")]
    EmployeeNotFound(String),

    #[error("Leave request {0} not found")]
    RequestNotFound(Uuid),

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("No check-in record found for today")]
    NoCheckInFound,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("Leave request {0} has already been reviewed")]
    AlreadyReviewed(Uuid),

    #[error("Insufficient {kind} balance: {remaining} remaining, {requested} requested")]
    InsufficientBalance {
        kind: LeaveType,
        remaining: Decimal,
        requested: Decimal,
    },

    #[error("Employee code {0} is already registered")]
    EmployeeCodeTaken(String),

    #[error("Store error: {0}")]
    Store(#[from] PortError),

    #[error("Mail dispatch error: {0}")]
    Mail(PortError),

    #[error("Report export failed: {0}")]
    Export(#[from] csv::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
