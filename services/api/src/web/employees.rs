//! services/api/src/web/employees.rs
//!
//! Onboarding, login and profile endpoints.

use attendance_core::Onboarding;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::rest::{EmployeeDto, HealthResponse, LoginRequest, OnboardRequest};
use crate::web::state::{AppState, SessionContext};

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /employees/onboard - Register the profile of a newly signed-in person
#[utoipa::path(
    post,
    path = "/employees/onboard",
    request_body = OnboardRequest,
    responses(
        (status = 201, description = "Employee created with default balances", body = EmployeeDto),
        (status = 400, description = "Invalid profile", body = ErrorBody),
        (status = 409, description = "Employee code already registered", body = ErrorBody)
    )
)]
pub async fn onboard_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnboardRequest>,
) -> ApiResult<impl IntoResponse> {
    let employee = state
        .directory
        .onboard(
            Onboarding {
                external_auth_id: req.external_auth_id,
                employee_code: req.employee_code,
                full_name: req.full_name,
                email: req.email.filter(|e| !e.trim().is_empty()),
                phone_number: req.phone_number,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(EmployeeDto::from(&employee))))
}

/// POST /employees/login - Resolve an employee code to its profile
#[utoipa::path(
    post,
    path = "/employees/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Employee found", body = EmployeeDto),
        (status = 404, description = "Unknown employee code", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<EmployeeDto>> {
    let employee = state.directory.login_by_code(&req.employee_code).await?;
    Ok(Json(EmployeeDto::from(&employee)))
}

/// GET /employees/me - The caller's profile and remaining balances
#[utoipa::path(
    get,
    path = "/employees/me",
    responses(
        (status = 200, description = "Caller profile", body = EmployeeDto),
        (status = 401, description = "Unknown caller", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn me_handler(Extension(ctx): Extension<SessionContext>) -> Json<EmployeeDto> {
    Json(EmployeeDto::from(&ctx.employee))
}
