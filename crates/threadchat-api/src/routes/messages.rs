use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use threadchat_types::{Message, MessageRole};

use crate::{
    error::{required, ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// Thread whose messages to return
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMessageResponse {
    pub success: bool,
    pub message: Message,
}

/// List the messages of a thread in conversation order
#[utoipa::path(
    get,
    path = "/messages",
    params(ListMessagesQuery),
    responses(
        (status = 200, description = "Messages, oldest first", body = [Message]),
        (status = 400, description = "Missing threadId")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Message>>> {
    let Query(query) = query?;
    let thread_id = required(query.thread_id, "threadId is required")?;

    let messages = state.persist.get_messages(&thread_id).await?;

    Ok(Json(messages))
}

/// Append a message to a thread
#[utoipa::path(
    post,
    path = "/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = CreateMessageResponse),
        (status = 400, description = "Missing fields or invalid role"),
        (status = 404, description = "Thread not found")
    ),
    tag = "messages"
)]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> ApiResult<Json<CreateMessageResponse>> {
    let Json(req) = payload?;

    // Blank content counts as missing; anything else is stored verbatim
    const MISSING: &str = "threadId, content, role are required";
    let thread_id = required(req.thread_id, MISSING)?;
    let content = required(req.content, MISSING)?;
    let role = required(req.role, MISSING)?;
    let role: MessageRole = role
        .parse()
        .map_err(|_| ApiError::BadRequest("role must be 'user' or 'assistant'".to_string()))?;

    let message = state
        .persist
        .create_message(&thread_id, role, &content)
        .await?;

    Ok(Json(CreateMessageResponse {
        success: true,
        message,
    }))
}
