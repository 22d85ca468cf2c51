use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use threadchat_llm::{EventStream, StreamEvent};
use threadchat_persist::PersistenceClient;
use threadchat_types::{ChatTurn, MessageRole};

use crate::{
    error::{required, ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequestBody {
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

/// Stream an assistant reply for the submitted turns as plain text
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Completion text, streamed", content_type = "text/plain"),
        (status = 400, description = "Missing threadId or messages, or an invalid role"),
        (status = 404, description = "Thread not found (only when turns are persisted server-side)"),
        (status = 500, description = "AI service unavailable")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let thread_id = required(req.thread_id, "threadId is required")?;
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest("messages array is required".to_string()));
    }

    let persist_turns = state.config.chat.persist_turns;
    if persist_turns {
        match req.messages.last() {
            Some(last) if last.role == MessageRole::User => {
                state
                    .persist
                    .create_message(&thread_id, MessageRole::User, &last.content)
                    .await?;
            }
            _ => {
                state
                    .persist
                    .get_thread(&thread_id)
                    .await?
                    .ok_or_else(|| ApiError::ThreadNotFound(thread_id.clone()))?;
            }
        }
    }

    let events = state
        .gateway
        .stream_reply(&req.messages)
        .await
        .map_err(ApiError::Upstream)?;

    tracing::info!(
        thread_id = %thread_id,
        turns = req.messages.len(),
        "Streaming completion"
    );

    let persist = persist_turns.then(|| Arc::clone(&state.persist));
    let body = Body::from_stream(relay_completion(events, thread_id, persist));

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// Forward completion text chunk by chunk.
///
/// A provider error mid-stream ends the body with an error so the client
/// sees a truncated response; the partial text is dropped. When `persist`
/// is set the full reply is stored once the stream finishes cleanly.
fn relay_completion(
    mut events: EventStream,
    thread_id: String,
    persist: Option<Arc<dyn PersistenceClient>>,
) -> impl Stream<Item = Result<String, std::io::Error>> + Send {
    async_stream::stream! {
        let mut reply = String::new();
        let mut interrupted = false;

        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Message { content }) => {
                    if content.is_empty() {
                        continue;
                    }
                    tracing::trace!(thread_id = %thread_id, len = content.len(), "Relaying chunk");
                    reply.push_str(&content);
                    yield Ok(content);
                }
                Ok(StreamEvent::Done { finish_reason }) => {
                    tracing::debug!(thread_id = %thread_id, ?finish_reason, "Completion finished");
                    break;
                }
                Err(e) => {
                    tracing::error!(thread_id = %thread_id, "Completion stream interrupted: {:#}", e);
                    interrupted = true;
                    yield Err(std::io::Error::other("completion stream interrupted"));
                    break;
                }
            }
        }

        if !interrupted {
            if let Some(persist) = persist {
                if reply.is_empty() {
                    tracing::warn!(thread_id = %thread_id, "Empty completion, nothing to save");
                } else if let Err(e) = persist
                    .create_message(&thread_id, MessageRole::Assistant, &reply)
                    .await
                {
                    tracing::error!(thread_id = %thread_id, "Failed to save assistant reply: {}", e);
                }
            }
        }
    }
}
