//! services/api/src/web/attendance.rs
//!
//! The caller's own attendance: today's record, recent history, and marking.

use attendance_core::{MarkAttendance, MarkKind};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::rest::{list, AttendanceDto, MarkAttendanceRequest, MarkKindDto, RecentQuery};
use crate::web::state::{AppState, SessionContext};

/// GET /attendance/today - The caller's record for the current business day
#[utoipa::path(
    get,
    path = "/attendance/today",
    responses(
        (status = 200, description = "Today's record, or null before check-in", body = Option<AttendanceDto>),
        (status = 401, description = "Unknown caller", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn today_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<Json<Option<AttendanceDto>>> {
    let record = state.attendance.today(ctx.employee.id, Utc::now()).await?;
    Ok(Json(record.as_ref().map(AttendanceDto::from)))
}

/// GET /attendance/recent - The caller's latest records, newest first
#[utoipa::path(
    get,
    path = "/attendance/recent",
    responses(
        (status = 200, description = "Recent records", body = Vec<AttendanceDto>),
        (status = 401, description = "Unknown caller", body = ErrorBody)
    ),
    params(
        RecentQuery,
        ("x-employee-id" = Uuid, Header, description = "The caller's employee id.")
    )
)]
pub async fn recent_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<AttendanceDto>>> {
    let records = state.attendance.recent(ctx.employee.id, query.limit).await?;
    Ok(Json(list(&records)))
}

/// POST /attendance/mark - Check in or check out for today
#[utoipa::path(
    post,
    path = "/attendance/mark",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "The updated record", body = AttendanceDto),
        (status = 400, description = "Missing photo or malformed request", body = ErrorBody),
        (status = 409, description = "Already checked in or out, or no check-in yet", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn mark_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<MarkAttendanceRequest>,
) -> ApiResult<Json<AttendanceDto>> {
    let kind = match req.kind {
        MarkKindDto::CheckIn => MarkKind::CheckIn,
        MarkKindDto::CheckOut => MarkKind::CheckOut,
    };
    let record = state
        .attendance
        .mark(
            ctx.employee.id,
            MarkAttendance {
                kind,
                photo_url: req.photo_url,
                request_key: req.request_key,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(AttendanceDto::from(&record)))
}
