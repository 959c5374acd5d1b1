//! Scheduler control HTTP handlers.

use axum::extract::State;
use axum::Json;

use super::types::{ApiResponse, AppState, IntervalRequest, ManualPostRequest, StartRequest};
use crate::config::Settings;
use crate::scheduler::PostOutcome;

/// Start auto-posting.
#[utoipa::path(
    post,
    path = "/scheduler/start",
    tag = "Scheduler",
    request_body = StartRequest,
    responses(
        (status = 200, description = "Auto-posting started")
    )
)]
pub async fn start_auto_posting(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Json<ApiResponse<()>> {
    let interval_secs = match req.interval_secs {
        Some(secs) => secs,
        None => match Settings::load(&state.store).await {
            Ok(settings) => settings.post_interval_secs,
            Err(e) => return ApiResponse::error(e.to_string()),
        },
    };

    match state
        .scheduler
        .start_auto_posting(interval_secs, req.immediate)
        .await
    {
        Ok(()) => ApiResponse::success(()),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Stop auto-posting.
#[utoipa::path(
    post,
    path = "/scheduler/stop",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Auto-posting stopped")
    )
)]
pub async fn stop_auto_posting(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    match state.scheduler.stop_auto_posting().await {
        Ok(()) => ApiResponse::success(()),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Pause ticks without destroying the timer.
#[utoipa::path(
    post,
    path = "/scheduler/pause",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Auto-posting paused")
    )
)]
pub async fn pause_auto_posting(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.scheduler.pause_auto_posting();
    ApiResponse::success(())
}

/// Resume a paused scheduler.
#[utoipa::path(
    post,
    path = "/scheduler/resume",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Auto-posting resumed")
    )
)]
pub async fn resume_auto_posting(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.scheduler.resume_auto_posting();
    ApiResponse::success(())
}

/// Update the posting interval; a running timer is recreated.
#[utoipa::path(
    post,
    path = "/scheduler/interval",
    tag = "Scheduler",
    request_body = IntervalRequest,
    responses(
        (status = 200, description = "Interval updated")
    )
)]
pub async fn update_interval(
    State(state): State<AppState>,
    Json(req): Json<IntervalRequest>,
) -> Json<ApiResponse<()>> {
    match state.scheduler.update_interval(req.seconds).await {
        Ok(()) => ApiResponse::success(()),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Post immediately, optionally promoting a specific question first.
#[utoipa::path(
    post,
    path = "/post",
    tag = "Scheduler",
    request_body = ManualPostRequest,
    responses(
        (status = 200, description = "Post outcome", body = PostOutcome)
    )
)]
pub async fn manual_post(
    State(state): State<AppState>,
    Json(req): Json<ManualPostRequest>,
) -> Json<ApiResponse<PostOutcome>> {
    match state.scheduler.manual_post(req.question_id).await {
        Ok(outcome) => ApiResponse::success(outcome),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}
