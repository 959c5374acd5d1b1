//! Status, settings, and health HTTP handlers.

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::Json;

use super::types::{
    ApiResponse, AppState, LockStatus, SettingsView, StoreStatus, SystemStatus,
    UpdateSettingsRequest,
};
use crate::config::{Settings, MIN_POST_INTERVAL_SECS};

/// Full system status: queue, scheduler, producer, notifications, and
/// internal counters.
#[utoipa::path(
    get,
    path = "/status",
    tag = "Status",
    responses(
        (status = 200, description = "System status", body = SystemStatus)
    )
)]
pub async fn get_system_status(State(state): State<AppState>) -> Json<ApiResponse<SystemStatus>> {
    let queue_stats = match state.queue.stats().await {
        Ok(stats) => stats,
        Err(e) => return ApiResponse::error(e.to_string()),
    };

    let store_stats = state.store.stats();
    let mutex = state.queue.mutex();

    ApiResponse::success(SystemStatus {
        queue: queue_stats,
        scheduler: state.scheduler.status(),
        producer: state.producer.lock().clone(),
        notifications: state.notifier.recent(),
        store: StoreStatus {
            cache_hits: store_stats.hits.load(Ordering::Relaxed),
            cache_misses: store_stats.misses.load(Ordering::Relaxed),
            batches_flushed: store_stats.batches_flushed.load(Ordering::Relaxed),
            writes_flushed: store_stats.writes_flushed.load(Ordering::Relaxed),
            evictions: store_stats.evictions.load(Ordering::Relaxed),
            cached_entries: state.store.cache_len(),
            pending_writes: state.store.pending_writes(),
        },
        lock: LockStatus {
            acquires: mutex.acquire_count(),
            releases: mutex.release_count(),
            queue_depth: mutex.queue_depth(),
            max_queue_depth: mutex.max_queue_depth(),
        },
    })
}

/// Read the persisted operational settings.
#[utoipa::path(
    get,
    path = "/settings",
    tag = "Status",
    responses(
        (status = 200, description = "Current settings", body = SettingsView)
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<ApiResponse<SettingsView>> {
    match Settings::load(&state.store).await {
        Ok(settings) => ApiResponse::success(settings.into()),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}

/// Update settings; absent fields keep their current value. Changing
/// the interval while running recreates the timer.
#[utoipa::path(
    put,
    path = "/settings",
    tag = "Status",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated settings", body = SettingsView)
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Json<ApiResponse<SettingsView>> {
    let mut settings = match Settings::load(&state.store).await {
        Ok(settings) => settings,
        Err(e) => return ApiResponse::error(e.to_string()),
    };

    if let Some(secs) = req.post_interval_secs {
        if secs < MIN_POST_INTERVAL_SECS {
            return ApiResponse::error(format!(
                "interval {}s is below the {}s minimum",
                secs, MIN_POST_INTERVAL_SECS
            ));
        }
        settings.post_interval_secs = secs;
    }
    if let Some(attempts) = req.max_retry_attempts {
        settings.max_retry_attempts = attempts;
    }
    if let Some(prefix) = req.question_prefix {
        settings.question_prefix = prefix;
    }
    if let Some(keywords) = req.ng_keywords {
        settings.ng_keywords = keywords;
    }
    if let Some(size) = req.max_queue_size {
        settings.max_queue_size = size.max(1);
    }

    if let Err(e) = settings.save(&state.store).await {
        return ApiResponse::error(e.to_string());
    }

    // Interval changes take effect on the running timer immediately.
    if let Some(secs) = req.post_interval_secs {
        if state.scheduler.is_running() {
            if let Err(e) = state.scheduler.update_interval(secs).await {
                return ApiResponse::error(e.to_string());
            }
        }
    }

    ApiResponse::success(settings.into())
}

/// Liveness probe (unauthenticated).
#[utoipa::path(
    get,
    path = "/health",
    tag = "Status",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
