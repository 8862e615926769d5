//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mail relays.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, BalanceCharge, ChatMessage, ChatParty, CheckOut, Employee, LeaveRequest,
    NewChatMessage, NewCheckIn, NewEmployee, NewLeaveRequest, ReviewOutcome,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint or a conditional write refused the operation.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The backing service timed out or could not hand out a connection.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The document store holding employees, attendance, leave requests and chat.
///
/// Every method is atomic on its own. Methods documented as conditional must
/// check and write in one step so concurrent callers cannot both succeed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Employees ---
    /// Fails with `Conflict` when the employee code or external auth id is taken.
    async fn insert_employee(&self, employee: NewEmployee) -> PortResult<Employee>;

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>>;

    async fn find_employee_by_code(&self, employee_code: &str) -> PortResult<Option<Employee>>;

    async fn list_employees(&self) -> PortResult<Vec<Employee>>;

    // --- Attendance ---
    async fn find_attendance(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<AttendanceRecord>>;

    /// Most recent first, by creation time.
    async fn recent_attendance(
        &self,
        employee_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AttendanceRecord>>;

    async fn attendance_on(&self, date: NaiveDate) -> PortResult<Vec<AttendanceRecord>>;

    /// Inclusive on both ends.
    async fn attendance_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<AttendanceRecord>>;

    /// Conditional create: fails with `Conflict` if a record already exists for
    /// the (employee, date) pair.
    async fn insert_check_in(&self, check_in: NewCheckIn) -> PortResult<AttendanceRecord>;

    /// Conditional update: applies only while the record is `checked-in`.
    /// Returns `None` when the record is missing or already checked out.
    async fn record_check_out(&self, check_out: CheckOut) -> PortResult<Option<AttendanceRecord>>;

    // --- Leave requests ---
    async fn insert_leave_request(&self, request: NewLeaveRequest) -> PortResult<LeaveRequest>;

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<Option<LeaveRequest>>;

    /// Most recent submission first.
    async fn leave_requests_for(&self, employee_id: Uuid) -> PortResult<Vec<LeaveRequest>>;

    async fn pending_leave_requests(&self) -> PortResult<Vec<LeaveRequest>>;

    /// Conditional update: applies only while the request is `pending`.
    /// Approvals are stored with `balance_applied = false`.
    /// Returns `None` when the request is missing or already reviewed.
    async fn complete_review(&self, outcome: ReviewOutcome) -> PortResult<Option<LeaveRequest>>;

    /// Adds an approved request's duration to the owner's used balance and marks
    /// the request as applied, in one atomic step. The addition only happens while
    /// `used + duration <= total`; otherwise the request goes back to `pending`
    /// in the same step and `Refused` is returned. `Skipped` means the request is
    /// not approved or already applied, and nothing was written.
    async fn apply_leave_balance(&self, request_id: Uuid) -> PortResult<BalanceCharge>;

    /// Approved requests whose balance update has not been applied yet.
    async fn unapplied_approvals(&self) -> PortResult<Vec<LeaveRequest>>;

    // --- Chat ---
    async fn insert_chat_message(&self, message: NewChatMessage) -> PortResult<ChatMessage>;

    /// All messages between the employee and the admin desk, oldest first.
    async fn conversation(&self, employee_id: Uuid) -> PortResult<Vec<ChatMessage>>;

    /// Flags unread messages from `sender` to `receiver` as read. Returns the count.
    async fn mark_read(&self, receiver: ChatParty, sender: ChatParty) -> PortResult<u64>;
}

/// A binary file attached to an outgoing mail.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Hands the mail to the dispatch collaborator.
    async fn send(&self, mail: OutgoingMail) -> PortResult<()>;
}
