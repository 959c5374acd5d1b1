//! Ingestion HTTP handlers.

use axum::extract::State;
use axum::Json;
use tracing::debug;

use super::types::{ApiResponse, AppState, IncomingItemsRequest, IngestResult};
use crate::protocol::now_ms;

/// Ingest observed items from the producer.
#[utoipa::path(
    post,
    path = "/items",
    tag = "Queue",
    request_body = IncomingItemsRequest,
    responses(
        (status = 200, description = "Ingestion summary", body = IngestResult)
    )
)]
pub async fn add_incoming_items(
    State(state): State<AppState>,
    Json(req): Json<IncomingItemsRequest>,
) -> Json<ApiResponse<IngestResult>> {
    {
        let mut producer = state.producer.lock();
        if req.context.logged_in.is_some() {
            producer.logged_in = req.context.logged_in;
        }
        producer.last_ingest_at = Some(now_ms());
    }

    let now = now_ms();
    let items: Vec<(String, u64)> = req
        .items
        .into_iter()
        .map(|item| {
            if let Some(id) = &item.id {
                debug!(producer_id = %id, "Incoming item");
            }
            (item.text, item.received_at.unwrap_or(now))
        })
        .collect();

    match state.queue.add_batch(items).await {
        Ok(outcome) => ApiResponse::success(IngestResult {
            added: outcome.added,
            duplicates: outcome.duplicates,
            rejected: outcome.rejected,
        }),
        Err(e) => ApiResponse::error(e.to_string()),
    }
}
