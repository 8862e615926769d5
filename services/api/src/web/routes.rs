//! services/api/src/web/routes.rs
//!
//! Assembles the HTTP router: public routes, employee routes behind
//! `require_employee`, and admin routes behind `require_admin` as well.

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::middleware::{require_admin, require_employee, EMPLOYEE_HEADER};
use crate::web::rest::ApiDoc;
use crate::web::state::AppState;
use crate::web::{admin, attendance, chat, employees, leaves};

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static(EMPLOYEE_HEADER)]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin = %origin, "CORS_ORIGIN is not a valid header value; cross-origin requests disabled");
            layer
        }
    }
}

/// Builds the complete application, Swagger UI included.
pub fn app(state: Arc<AppState>) -> Router {
    // Public routes (no caller required)
    let public_routes = Router::new()
        .route("/health", get(employees::health_handler))
        .route("/employees/onboard", post(employees::onboard_handler))
        .route("/employees/login", post(employees::login_handler));

    // Employee routes (any known caller)
    let employee_routes = Router::new()
        .route("/employees/me", get(employees::me_handler))
        .route("/attendance/today", get(attendance::today_handler))
        .route("/attendance/recent", get(attendance::recent_handler))
        .route("/attendance/mark", post(attendance::mark_handler))
        .route(
            "/leaves",
            get(leaves::list_leaves_handler).post(leaves::submit_leave_handler),
        )
        .route(
            "/chat/messages",
            get(chat::my_conversation_handler).post(chat::send_my_message_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_employee,
        ));

    // Admin routes (superadmin callers only)
    let admin_routes = Router::new()
        .route("/admin/employees", get(admin::list_employees_handler))
        .route("/admin/attendance/today", get(admin::attendance_today_handler))
        .route("/admin/leaves/pending", get(admin::pending_leaves_handler))
        .route("/admin/leaves/{id}/review", post(admin::review_leave_handler))
        .route("/admin/reports/daily", post(admin::trigger_daily_report_handler))
        .route("/admin/reports/monthly", post(admin::trigger_monthly_report_handler))
        .route(
            "/admin/chat/{employee_id}/messages",
            get(admin::conversation_handler).post(admin::send_message_handler),
        )
        .route_layer(axum_middleware::from_fn(require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_employee,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(employee_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origin))
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
