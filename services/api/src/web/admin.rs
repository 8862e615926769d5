//! services/api/src/web/admin.rs
//!
//! Superadmin endpoints: company-wide views, leave review, report triggers and
//! the admin side of the chat desk.

use attendance_core::ReviewDecision;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::rest::{
    list, AcceptedResponse, AttendanceDto, ChatMessageDto, EmployeeDto, LeaveRequestDto,
    ReviewDecisionDto, ReviewRequest, SendMessageRequest,
};
use crate::web::state::{AppState, SessionContext};

//=========================================================================================
// Views
//=========================================================================================

/// GET /admin/employees - Every employee with balances
#[utoipa::path(
    get,
    path = "/admin/employees",
    responses(
        (status = 200, description = "All employees", body = Vec<EmployeeDto>),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn list_employees_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<EmployeeDto>>> {
    let employees = state.directory.list_all().await?;
    Ok(Json(list(&employees)))
}

/// GET /admin/attendance/today - Everyone's record for the current business day
#[utoipa::path(
    get,
    path = "/admin/attendance/today",
    responses(
        (status = 200, description = "Today's records in check-in order", body = Vec<AttendanceDto>),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn attendance_today_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AttendanceDto>>> {
    let records = state.attendance.all_today(Utc::now()).await?;
    Ok(Json(list(&records)))
}

/// GET /admin/leaves/pending - Requests awaiting review
#[utoipa::path(
    get,
    path = "/admin/leaves/pending",
    responses(
        (status = 200, description = "Pending requests", body = Vec<LeaveRequestDto>),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn pending_leaves_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<LeaveRequestDto>>> {
    let requests = state.ledger.list_pending().await?;
    Ok(Json(list(&requests)))
}

//=========================================================================================
// Leave review
//=========================================================================================

/// POST /admin/leaves/{id}/review - Approve or reject a pending request
#[utoipa::path(
    post,
    path = "/admin/leaves/{id}/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "The reviewed request", body = LeaveRequestDto),
        (status = 404, description = "No such request", body = ErrorBody),
        (status = 409, description = "Already reviewed, or balance exhausted", body = ErrorBody)
    ),
    params(
        ("id" = Uuid, Path, description = "The leave request id."),
        ("x-employee-id" = Uuid, Header, description = "The caller's employee id.")
    )
)]
pub async fn review_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<LeaveRequestDto>> {
    let decision = match req.decision {
        ReviewDecisionDto::Approved => ReviewDecision::Approved,
        ReviewDecisionDto::Rejected => ReviewDecision::Rejected,
    };
    let reviewed = state
        .ledger
        .review(request_id, decision, ctx.employee.id, Utc::now())
        .await?;
    Ok(Json(LeaveRequestDto::from(&reviewed)))
}

//=========================================================================================
// Report triggers
//=========================================================================================

/// POST /admin/reports/daily - Send today's report now
#[utoipa::path(
    post,
    path = "/admin/reports/daily",
    responses(
        (status = 202, description = "Report job started", body = AcceptedResponse),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn trigger_daily_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> impl IntoResponse {
    info!(requested_by = %ctx.employee.id, "Daily report triggered manually");
    let reporter = state.reporter.clone();
    tokio::spawn(async move {
        if let Err(e) = reporter.send_daily(Utc::now()).await {
            error!(error = %e, "Manually triggered daily report failed");
        }
    });
    accepted("daily-report")
}

/// POST /admin/reports/monthly - Send last month's report now
#[utoipa::path(
    post,
    path = "/admin/reports/monthly",
    responses(
        (status = 202, description = "Report job started", body = AcceptedResponse),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn trigger_monthly_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> impl IntoResponse {
    info!(requested_by = %ctx.employee.id, "Monthly report triggered manually");
    let reporter = state.reporter.clone();
    tokio::spawn(async move {
        if let Err(e) = reporter.send_monthly(Utc::now()).await {
            error!(error = %e, "Manually triggered monthly report failed");
        }
    });
    accepted("monthly-report")
}

fn accepted(job: &str) -> (StatusCode, Json<AcceptedResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            job: job.to_string(),
        }),
    )
}

//=========================================================================================
// Chat desk
//=========================================================================================

/// GET /admin/chat/{employee_id}/messages - The desk's conversation with one employee
///
/// Messages from the employee are marked read by this call.
#[utoipa::path(
    get,
    path = "/admin/chat/{employee_id}/messages",
    responses(
        (status = 200, description = "The conversation, oldest first", body = Vec<ChatMessageDto>),
        (status = 404, description = "No such employee", body = ErrorBody)
    ),
    params(
        ("employee_id" = Uuid, Path, description = "The employee on the other side."),
        ("x-employee-id" = Uuid, Header, description = "The caller's employee id.")
    )
)]
pub async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatMessageDto>>> {
    state.directory.get(employee_id).await?;
    let messages = state.chat.conversation(&ctx.employee, employee_id).await?;
    Ok(Json(list(&messages)))
}

/// POST /admin/chat/{employee_id}/messages - Reply to an employee from the desk
#[utoipa::path(
    post,
    path = "/admin/chat/{employee_id}/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = ChatMessageDto),
        (status = 400, description = "Empty or oversized message", body = ErrorBody),
        (status = 404, description = "No such employee", body = ErrorBody)
    ),
    params(
        ("employee_id" = Uuid, Path, description = "The employee on the other side."),
        ("x-employee-id" = Uuid, Header, description = "The caller's employee id.")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    state.directory.get(employee_id).await?;
    let message = state
        .chat
        .send(&ctx.employee, employee_id, &req.text, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ChatMessageDto::from(&message))))
}
