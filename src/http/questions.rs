//! Question CRUD HTTP handlers.

use axum::extract::{Path, Query, State};
use axum::Json;

use super::types::{ApiResponse, AppState, ClearQuery};
use crate::protocol::Question;

/// List the queue (defensive copy, ordered by received_at).
#[utoipa::path(
    get,
    path = "/questions",
    tag = "Queue",
    responses(
        (status = 200, description = "All queued questions", body = Vec<Question>)
    )
)]
pub async fn list_questions(State(state): State<AppState>) -> Json<ApiResponse<Vec<Question>>> {
    match state.queue.snapshot().await {
        Ok(queue) => ApiResponse::success(queue),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Promote a pending question to next.
#[utoipa::path(
    post,
    path = "/questions/{id}/next",
    tag = "Queue",
    params(("id" = u64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question promoted")
    )
)]
pub async fn set_question_as_next(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<ApiResponse<()>> {
    match state.queue.set_as_next(id).await {
        Ok(true) => ApiResponse::success(()),
        Ok(false) => ApiResponse::error(format!("question {} not found or not pending", id)),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Delete a question.
#[utoipa::path(
    delete,
    path = "/questions/{id}",
    tag = "Queue",
    params(("id" = u64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question deleted")
    )
)]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<ApiResponse<()>> {
    match state.queue.delete_question(id).await {
        Ok(true) => ApiResponse::success(()),
        Ok(false) => ApiResponse::error(format!("question {} not found", id)),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Clear pending questions; `include_sent` also drops the history.
#[utoipa::path(
    delete,
    path = "/questions",
    tag = "Queue",
    params(ClearQuery),
    responses(
        (status = 200, description = "Number of removed questions", body = usize)
    )
)]
pub async fn clear_queue(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Json<ApiResponse<usize>> {
    match state.queue.clear_queue(query.include_sent).await {
        Ok(removed) => ApiResponse::success(removed),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}
