//! HTTP API request and response types.

use std::sync::Arc;

use axum::Json;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::notify::{Notification, Notifier};
use crate::protocol::{QueueStats, SchedulerStatus};
use crate::queue::QuestionQueue;
use crate::scheduler::Scheduler;
use crate::store::CachedStore;

/// Last-seen producer context, surfaced in the status report.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct ProducerState {
    pub logged_in: Option<bool>,
    pub last_ingest_at: Option<u64>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<QuestionQueue>,
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<CachedStore>,
    pub notifier: Arc<Notifier>,
    pub auth_tokens: Arc<Vec<String>>,
    pub producer: Arc<Mutex<ProducerState>>,
}

/// Uniform response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            ok: true,
            data: Some(data),
            error: None,
        })
    }

    pub fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        })
    }
}

/// One observed item from the producer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IncomingItem {
    /// Producer-side identifier; informational only.
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    /// Unix ms; defaults to arrival time.
    #[serde(default)]
    pub received_at: Option<u64>,
}

/// Producer context accompanying an ingestion batch.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct IngestContext {
    #[serde(default)]
    pub logged_in: Option<bool>,
}

/// addIncomingItems request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IncomingItemsRequest {
    pub items: Vec<IncomingItem>,
    #[serde(default)]
    pub context: IngestContext,
}

/// Ingestion outcome summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResult {
    pub added: Vec<u64>,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Manual post request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ManualPostRequest {
    #[serde(default)]
    pub question_id: Option<u64>,
}

/// startAutoPosting request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartRequest {
    /// Defaults to the persisted interval setting.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub immediate: bool,
}

/// updateInterval request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IntervalRequest {
    pub seconds: u64,
}

/// clearQueue query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ClearQuery {
    #[serde(default)]
    pub include_sent: bool,
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub post_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_retry_attempts: Option<u32>,
    #[serde(default)]
    pub question_prefix: Option<String>,
    #[serde(default)]
    pub ng_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub max_queue_size: Option<usize>,
}

/// Persisted operational settings as reported by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsView {
    pub post_interval_secs: u64,
    pub max_retry_attempts: u32,
    pub question_prefix: String,
    pub ng_keywords: Vec<String>,
    pub max_queue_size: usize,
}

impl From<crate::config::Settings> for SettingsView {
    fn from(s: crate::config::Settings) -> Self {
        Self {
            post_interval_secs: s.post_interval_secs,
            max_retry_attempts: s.max_retry_attempts,
            question_prefix: s.question_prefix,
            ng_keywords: s.ng_keywords,
            max_queue_size: s.max_queue_size,
        }
    }
}

/// Store counters for the status report.
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreStatus {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub batches_flushed: u64,
    pub writes_flushed: u64,
    pub evictions: u64,
    pub cached_entries: usize,
    pub pending_writes: usize,
}

/// Queue-lock counters for the status report.
#[derive(Debug, Serialize, ToSchema)]
pub struct LockStatus {
    pub acquires: u64,
    pub releases: u64,
    pub queue_depth: usize,
    pub max_queue_depth: usize,
}

/// getSystemStatus response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatus {
    pub queue: QueueStats,
    pub scheduler: SchedulerStatus,
    pub producer: ProducerState,
    pub notifications: Vec<Notification>,
    pub store: StoreStatus,
    pub lock: LockStatus,
}
