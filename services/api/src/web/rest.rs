//! services/api/src/web/rest.rs
//!
//! Contains the request and response payloads of the REST API and the master
//! definition for the OpenAPI specification.
//!
//! Instants are sent as epoch milliseconds and calendar days as `YYYY-MM-DD`.

use attendance_core::{AttendanceRecord, ChatMessage, Employee, LeaveRequest};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::web::{admin, attendance, chat, employees, leaves};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        employees::health_handler,
        employees::onboard_handler,
        employees::login_handler,
        employees::me_handler,
        attendance::today_handler,
        attendance::recent_handler,
        attendance::mark_handler,
        leaves::list_leaves_handler,
        leaves::submit_leave_handler,
        chat::my_conversation_handler,
        chat::send_my_message_handler,
        admin::list_employees_handler,
        admin::attendance_today_handler,
        admin::pending_leaves_handler,
        admin::review_leave_handler,
        admin::trigger_daily_report_handler,
        admin::trigger_monthly_report_handler,
        admin::conversation_handler,
        admin::send_message_handler,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            EmployeeDto,
            OnboardRequest,
            LoginRequest,
            AttendanceDto,
            MarkKindDto,
            MarkAttendanceRequest,
            LeaveRequestDto,
            SubmitLeaveRequest,
            ReviewDecisionDto,
            ReviewRequest,
            ChatMessageDto,
            SendMessageRequest,
            AcceptedResponse,
        )
    ),
    tags(
        (name = "Attendance API", description = "Attendance marking, leave requests, chat and reports.")
    )
)]
pub struct ApiDoc;

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

//=========================================================================================
// Employees
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// An employee profile with current balances.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeDto {
    pub id: Uuid,
    pub employee_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub created_at: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_leaves: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub used_leaves: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_leaves: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_permissions: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub used_permissions: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_permissions: Decimal,
}

impl From<&Employee> for EmployeeDto {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id,
            employee_code: e.employee_code.clone(),
            full_name: e.full_name.clone(),
            email: e.email.clone(),
            phone_number: e.phone_number.clone(),
            role: e.role.as_str().to_string(),
            created_at: e.created_at.timestamp_millis(),
            total_leaves: e.total_leaves,
            used_leaves: e.used_leaves,
            remaining_leaves: e.remaining_leaves(),
            total_permissions: e.total_permissions,
            used_permissions: e.used_permissions,
            remaining_permissions: e.remaining_permissions(),
        }
    }
}

/// The profile form filled in after first sign-in with the identity provider.
#[derive(Deserialize, ToSchema)]
pub struct OnboardRequest {
    pub external_auth_id: String,
    pub employee_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub employee_code: String,
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceDto {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    /// Business day, `YYYY-MM-DD`.
    pub date: String,
    pub check_in: Option<i64>,
    pub check_out: Option<i64>,
    pub check_in_photo_url: Option<String>,
    pub check_out_photo_url: Option<String>,
    pub status: String,
}

impl From<&AttendanceRecord> for AttendanceDto {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            id: r.id,
            employee_id: r.employee_id,
            employee_name: r.employee_name.clone(),
            date: day(r.date),
            check_in: r.check_in.map(|t| t.timestamp_millis()),
            check_out: r.check_out.map(|t| t.timestamp_millis()),
            check_in_photo_url: r.check_in_photo_url.clone(),
            check_out_photo_url: r.check_out_photo_url.clone(),
            status: r.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKindDto {
    CheckIn,
    CheckOut,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    #[serde(rename = "type")]
    pub kind: MarkKindDto,
    /// Reference to the verification photo already uploaded by the client.
    pub photo_url: String,
    /// Optional retry key; resending the same event with the same key is safe.
    pub request_key: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentQuery {
    /// How many records to return (1-100, default 10).
    pub limit: Option<usize>,
}

//=========================================================================================
// Leave requests
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequestDto {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub duration: Decimal,
    pub reason: String,
    pub status: String,
    pub submitted_at: i64,
    pub reviewed_at: Option<i64>,
    pub reviewed_by: Option<Uuid>,
}

impl From<&LeaveRequest> for LeaveRequestDto {
    fn from(r: &LeaveRequest) -> Self {
        Self {
            id: r.id,
            employee_id: r.employee_id,
            employee_name: r.employee_name.clone(),
            kind: r.kind.as_str().to_string(),
            start_date: day(r.start_date),
            end_date: day(r.end_date),
            duration: r.duration,
            reason: r.reason.clone(),
            status: r.status.as_str().to_string(),
            submitted_at: r.submitted_at.timestamp_millis(),
            reviewed_at: r.reviewed_at.map(|t| t.timestamp_millis()),
            reviewed_by: r.reviewed_by,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitLeaveRequest {
    /// `leave` (days) or `permission` (hours).
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub duration: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecisionDto {
    Approved,
    Rejected,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub decision: ReviewDecisionDto,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageDto {
    pub id: Uuid,
    /// An employee id, or `superadmin` for the admin desk.
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: String,
    pub receiver_id: String,
    pub text: String,
    pub sent_at: i64,
    pub read: bool,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender.to_string(),
            sender_name: m.sender_name.clone(),
            sender_role: m.sender_role.as_str().to_string(),
            receiver_id: m.receiver.to_string(),
            text: m.text.clone(),
            sent_at: m.sent_at.timestamp_millis(),
            read: m.read,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub text: String,
}

//=========================================================================================
// Jobs
//=========================================================================================

/// Returned when a report job has been started in the background.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedResponse {
    pub job: String,
}

pub fn list<'a, T, D>(items: impl IntoIterator<Item = &'a T>) -> Vec<D>
where
    T: 'a,
    D: From<&'a T>,
{
    items.into_iter().map(D::from).collect()
}
