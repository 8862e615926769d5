//! services/api/src/web/chat.rs
//!
//! The caller's conversation with the admin desk.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::rest::{list, ChatMessageDto, SendMessageRequest};
use crate::web::state::{AppState, SessionContext};

/// GET /chat/messages - The caller's conversation, oldest first
///
/// Messages from the admin desk are marked read by this call.
#[utoipa::path(
    get,
    path = "/chat/messages",
    responses(
        (status = 200, description = "The conversation", body = Vec<ChatMessageDto>),
        (status = 401, description = "Unknown caller", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn my_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<Json<Vec<ChatMessageDto>>> {
    let messages = state.chat.conversation(&ctx.employee, ctx.employee.id).await?;
    Ok(Json(list(&messages)))
}

/// POST /chat/messages - Write to the admin desk
#[utoipa::path(
    post,
    path = "/chat/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = ChatMessageDto),
        (status = 400, description = "Empty or oversized message", body = ErrorBody)
    ),
    params(("x-employee-id" = Uuid, Header, description = "The caller's employee id."))
)]
pub async fn send_my_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state
        .chat
        .send(&ctx.employee, ctx.employee.id, &req.text, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ChatMessageDto::from(&message))))
}
