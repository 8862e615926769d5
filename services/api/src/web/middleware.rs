//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use attendance_core::CoreError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::{AppState, SessionContext};

/// Header carrying the caller's employee id, set by the client after login.
pub const EMPLOYEE_HEADER: &str = "x-employee-id";

/// Resolves the caller from the `x-employee-id` header.
///
/// If the id belongs to a known employee, inserts a `SessionContext` into the
/// request extensions for handlers to use. Otherwise returns 401 Unauthorized.
pub async fn require_employee(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let employee_id = req
        .headers()
        .get(EMPLOYEE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(CoreError::NotAuthorized)?;

    let employee = state
        .store
        .get_employee(employee_id)
        .await
        .map_err(CoreError::from)?
        .ok_or_else(|| {
            debug!(employee_id = %employee_id, "Unknown caller rejected");
            CoreError::NotAuthorized
        })?;

    req.extensions_mut().insert(SessionContext { employee });
    Ok(next.run(req).await)
}

/// Lets the request through only for superadmins. Must run after `require_employee`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let context = req
        .extensions()
        .get::<SessionContext>()
        .ok_or(CoreError::NotAuthorized)?;
    if !context.employee.is_admin() {
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}
