use axum::Json;
use utoipa::OpenApi;

use threadchat_types::{ChatTurn, Message, MessageRole, Thread};

use crate::handlers::chat;
use crate::routes::{health, messages, threads};

#[derive(OpenApi)]
#[openapi(
    info(title = "threadchat API"),
    paths(
        health::health_check,
        threads::create_thread,
        threads::list_threads,
        threads::get_thread,
        threads::update_thread,
        threads::delete_thread,
        messages::list_messages,
        messages::create_message,
        chat::chat,
    ),
    components(schemas(
        Thread,
        Message,
        MessageRole,
        ChatTurn,
        health::HealthResponse,
        threads::TitleRequest,
        threads::UpdateThreadResponse,
        threads::DeleteThreadResponse,
        messages::CreateMessageRequest,
        messages::CreateMessageResponse,
        chat::ChatRequestBody,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "threads", description = "Conversation threads"),
        (name = "messages", description = "Persisted messages"),
        (name = "chat", description = "Streamed completions")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
