//! Core QuestionQueue struct and persistence helpers.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::config::keys;
use crate::protocol::{set_id_counter, Question};
use crate::store::{CachedStore, StorageError};
use crate::sync::FairMutex;

/// Queue operation error.
#[derive(Debug)]
pub enum QueueError {
    /// Input rejected before any mutation.
    Validation(String),
    /// Queue at capacity and nothing is eligible for eviction.
    QueueFull,
    /// Backing store failure.
    Storage(StorageError),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Validation(e) => write!(f, "validation error: {}", e),
            QueueError::QueueFull => write!(f, "queue is full"),
            QueueError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<StorageError> for QueueError {
    fn from(e: StorageError) -> Self {
        QueueError::Storage(e)
    }
}

/// Owns question entities and their lifecycle. All mutations serialize
/// through the injected [`FairMutex`].
pub struct QuestionQueue {
    pub(crate) store: Arc<CachedStore>,
    pub(crate) mutex: Arc<FairMutex>,
}

impl QuestionQueue {
    pub fn new(store: Arc<CachedStore>, mutex: Arc<FairMutex>) -> Arc<Self> {
        Arc::new(Self { store, mutex })
    }

    /// Lock observability for the status endpoint.
    pub fn mutex(&self) -> &FairMutex {
        &self.mutex
    }

    pub(crate) async fn load(&self) -> Result<Vec<Question>, QueueError> {
        Ok(self
            .store
            .get_or(keys::QUESTION_QUEUE, Vec::new())
            .await?)
    }

    pub(crate) async fn persist(&self, queue: &Vec<Question>) -> Result<(), QueueError> {
        Ok(self.store.set(keys::QUESTION_QUEUE, queue).await?)
    }

    /// Resume the id counter after the highest persisted id. Called once
    /// on startup, before any ingestion.
    pub async fn recover_id_counter(&self) -> Result<(), QueueError> {
        self.mutex
            .with_lock(|| async move {
                let queue = self.load().await?;
                if let Some(max_id) = queue.iter().map(|q| q.id).max() {
                    set_id_counter(max_id + 1);
                    info!(next_id = max_id + 1, "Resumed question id counter");
                }
                Ok(())
            })
            .await
    }
}
