//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Leave days granted to a freshly onboarded employee.
pub const DEFAULT_TOTAL_LEAVES: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
/// Permission hours granted to a freshly onboarded employee.
pub const DEFAULT_TOTAL_PERMISSIONS: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

//=========================================================================================
// Employees
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Superadmin => "superadmin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// A person on the payroll, with their leave and permission entitlements.
#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub external_auth_id: String,
    /// Human-readable code assigned at onboarding. Unique and immutable.
    pub employee_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub total_leaves: Decimal,
    pub used_leaves: Decimal,
    pub total_permissions: Decimal,
    pub used_permissions: Decimal,
}

impl Employee {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Superadmin
    }

    pub fn remaining_leaves(&self) -> Decimal {
        self.total_leaves - self.used_leaves
    }

    pub fn remaining_permissions(&self) -> Decimal {
        self.total_permissions - self.used_permissions
    }

    /// Remaining entitlement for the balance that `kind` draws from.
    pub fn remaining(&self, kind: LeaveType) -> Decimal {
        match kind {
            LeaveType::Leave => self.remaining_leaves(),
            LeaveType::Permission => self.remaining_permissions(),
        }
    }
}

/// The fields the store needs to persist a new employee.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub external_auth_id: String,
    pub employee_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub total_leaves: Decimal,
    pub total_permissions: Decimal,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    CheckedIn,
    CheckedOut,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::CheckedIn => "checked-in",
            AttendanceStatus::CheckedOut => "checked-out",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checked-in" => Ok(AttendanceStatus::CheckedIn),
            "checked-out" => Ok(AttendanceStatus::CheckedOut),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("Invalid attendance status: {}", other)),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two attendance events bounding a work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    CheckIn,
    CheckOut,
}

impl MarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkKind::CheckIn => "check-in",
            MarkKind::CheckOut => "check-out",
        }
    }
}

impl FromStr for MarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-in" => Ok(MarkKind::CheckIn),
            "check-out" => Ok(MarkKind::CheckOut),
            other => Err(format!("Invalid attendance event: {}", other)),
        }
    }
}

/// One employee's attendance for one business day.
///
/// `employee_name` is copied at check-in time; a later rename does not rewrite it.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub check_in_photo_url: Option<String>,
    pub check_out_photo_url: Option<String>,
    /// Client-supplied retry keys; a repeated event with the same key is answered
    /// with the stored record.
    pub check_in_key: Option<String>,
    pub check_out_key: Option<String>,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}

/// The row written by a first check-in of the day.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
    pub photo_url: String,
    pub request_key: Option<String>,
}

/// The fields set on the day's record by a check-out.
#[derive(Debug, Clone)]
pub struct CheckOut {
    pub record_id: Uuid,
    pub at: DateTime<Utc>,
    pub photo_url: String,
    pub request_key: Option<String>,
}

//=========================================================================================
// Leave and permission requests
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveType {
    /// Measured in days.
    Leave,
    /// Measured in hours.
    Permission,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Leave => "leave",
            LeaveType::Permission => "permission",
        }
    }
}

impl FromStr for LeaveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave" => Ok(LeaveType::Leave),
            "permission" => Ok(LeaveType::Permission),
            other => Err(format!("Invalid request type: {}", other)),
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("Invalid request status: {}", other)),
        }
    }
}

/// The outcome an administrator can give a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for RequestStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => RequestStatus::Approved,
            ReviewDecision::Rejected => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub kind: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Days for `Leave`, hours for `Permission`.
    pub duration: Decimal,
    pub reason: String,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    /// Set once the employee's used balance reflects this approval.
    /// Rejected and pending requests never carry a pending balance update.
    pub balance_applied: bool,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub kind: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: Decimal,
    pub reason: String,
    pub submitted_at: DateTime<Utc>,
}

/// The terminal write made by a review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: Uuid,
}

/// What happened when an approved request was charged to its owner's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCharge {
    Applied,
    /// The request is not approved, or its charge was already applied.
    Skipped,
    /// The charge would exceed the entitlement. The request was put back to
    /// `pending` and no balance changed.
    Refused { remaining: Decimal },
}

//=========================================================================================
// Chat
//=========================================================================================

/// One end of a conversation: a specific employee, or the shared admin desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatParty {
    Employee(Uuid),
    AdminDesk,
}

impl ChatParty {
    pub const ADMIN_DESK_ID: &'static str = "superadmin";
}

impl fmt::Display for ChatParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatParty::Employee(id) => write!(f, "{}", id),
            ChatParty::AdminDesk => f.write_str(Self::ADMIN_DESK_ID),
        }
    }
}

impl FromStr for ChatParty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::ADMIN_DESK_ID {
            return Ok(ChatParty::AdminDesk);
        }
        Uuid::parse_str(s)
            .map(ChatParty::Employee)
            .map_err(|_| format!("Invalid chat party: {}", s))
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: ChatParty,
    pub sender_name: String,
    pub sender_role: Role,
    pub receiver: ChatParty,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub sender: ChatParty,
    pub sender_name: String,
    pub sender_role: Role,
    pub receiver: ChatParty,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}
