use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use threadchat_types::Thread;

use crate::{
    error::{required, ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TitleRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateThreadResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteThreadResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/threads",
    request_body = TitleRequest,
    responses(
        (status = 201, description = "Thread created", body = Thread),
        (status = 400, description = "Missing or empty title")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TitleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Thread>)> {
    let Json(req) = payload?;
    let title = required(req.title, "Title is required and must be a non-empty string")?;

    let thread = state.persist.create_thread(title.trim()).await?;
    tracing::info!(thread_id = %thread.id, "Thread created");

    Ok((StatusCode::CREATED, Json(thread)))
}

/// List all threads, newest first
#[utoipa::path(
    get,
    path = "/threads",
    responses(
        (status = 200, description = "List of threads", body = [Thread])
    ),
    tag = "threads"
)]
pub async fn list_threads(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Thread>>> {
    let threads = state.persist.list_threads().await?;
    tracing::debug!(count = threads.len(), "Threads listed");

    Ok(Json(threads))
}

/// Get a specific thread by ID
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = Thread),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .persist
        .get_thread(&thread_id)
        .await?
        .ok_or(ApiError::ThreadNotFound(thread_id))?;

    Ok(Json(thread))
}

/// Rename a thread
#[utoipa::path(
    put,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = TitleRequest,
    responses(
        (status = 200, description = "Thread renamed", body = UpdateThreadResponse),
        (status = 400, description = "Missing or empty title"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    payload: Result<Json<TitleRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateThreadResponse>> {
    let Json(req) = payload?;
    let title = required(req.title, "Title is required")?;
    let title = title.trim().to_string();

    if !state.persist.update_thread_title(&thread_id, &title).await? {
        return Err(ApiError::ThreadNotFound(thread_id));
    }

    Ok(Json(UpdateThreadResponse {
        success: true,
        message: "Thread title updated".to_string(),
        thread_id,
        title,
    }))
}

/// Delete a thread and all of its messages
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread deleted", body = DeleteThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<DeleteThreadResponse>> {
    if !state.persist.delete_thread(&thread_id).await? {
        return Err(ApiError::ThreadNotFound(thread_id));
    }
    tracing::info!(thread_id = %thread_id, "Thread deleted");

    Ok(Json(DeleteThreadResponse {
        success: true,
        message: "Thread deleted successfully".to_string(),
        thread_id,
    }))
}
