//! services/api/src/web/leaves.rs
//!
//! The caller's leave and permission requests.

use attendance_core::LeaveSubmission;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::rest::{list, LeaveRequestDto, SubmitLeaveRequest};
use crate::web::state::{AppState, SessionContext};

/// GET /leaves - The caller's requests, most recent first
#[utoipa::path(
    get,
    path = "/leaves",
    responses(
        (status = 200, description = "The caller's requests", body = Vec<LeaveRequestDto>),
        (status = 401, description = "Unknown caller", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn list_leaves_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<Json<Vec<LeaveRequestDto>>> {
    let requests = state.ledger.list_for_employee(ctx.employee.id).await?;
    Ok(Json(list(&requests)))
}

/// POST /leaves - File a leave or permission request
#[utoipa::path(
    post,
    path = "/leaves",
    request_body = SubmitLeaveRequest,
    responses(
        (status = 201, description = "Request filed as pending", body = LeaveRequestDto),
        (status = 400, description = "Invalid request", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn submit_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<SubmitLeaveRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .ledger
        .submit(
            ctx.employee.id,
            LeaveSubmission {
                kind: req.kind,
                start_date: req.start_date,
                end_date: req.end_date,
                duration: req.duration,
                reason: req.reason,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(LeaveRequestDto::from(&request))))
}
