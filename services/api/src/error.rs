//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! failure is rendered as an HTTP response.

use crate::config::ConfigError;
use attendance_core::{CoreError, PortError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A business rule or store failure coming out of the core services.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The caller is known but lacks the role the route requires.
    #[error("Forbidden")]
    Forbidden,

    /// A malformed path or query parameter.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable error code.
    pub code: &'static str,
    /// Per-field validation messages, only present for `validation_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(core) => match core {
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
                CoreError::EmployeeNotFound(_) => (StatusCode::NOT_FOUND, "employee_not_found"),
                CoreError::RequestNotFound(_) => (StatusCode::NOT_FOUND, "request_not_found"),
                CoreError::NotAuthorized => (StatusCode::UNAUTHORIZED, "not_authorized"),
                CoreError::AlreadyCheckedIn => (StatusCode::CONFLICT, "already_checked_in"),
                CoreError::NoCheckInFound => (StatusCode::CONFLICT, "no_check_in_found"),
                CoreError::AlreadyCheckedOut => (StatusCode::CONFLICT, "already_checked_out"),
                CoreError::AlreadyReviewed(_) => (StatusCode::CONFLICT, "already_reviewed"),
                CoreError::InsufficientBalance { .. } => {
                    (StatusCode::CONFLICT, "insufficient_balance")
                }
                CoreError::EmployeeCodeTaken(_) => (StatusCode::CONFLICT, "employee_code_taken"),
                CoreError::Store(PortError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
                CoreError::Store(PortError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
                CoreError::Store(PortError::Unavailable(_)) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
                }
                CoreError::Store(PortError::Unexpected(_)) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
                }
                CoreError::Mail(_) => (StatusCode::INTERNAL_SERVER_ERROR, "mail_failed"),
                CoreError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = if status.is_server_error() {
            error!(error = %self, code, "Request failed");
            ErrorBody {
                error: match status {
                    StatusCode::SERVICE_UNAVAILABLE => "The record store is unavailable".to_string(),
                    _ => "An internal error occurred".to_string(),
                },
                code,
                fields: None,
            }
        } else {
            let fields = match &self {
                ApiError::Core(CoreError::Validation(errors)) => Some(field_messages(errors)),
                _ => None,
            };
            ErrorBody {
                error: self.to_string(),
                code,
                fields,
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::LeaveType;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn core_errors_map_to_their_status_family() {
        assert_eq!(status_of(CoreError::NotAuthorized.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ApiError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(CoreError::RequestNotFound(Uuid::new_v4()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(CoreError::AlreadyCheckedOut.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(
                CoreError::InsufficientBalance {
                    kind: LeaveType::Leave,
                    remaining: Decimal::ONE,
                    requested: Decimal::TWO,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::Store(PortError::Unavailable("pool timed out".into())).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
