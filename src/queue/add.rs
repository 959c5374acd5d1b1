//! Ingestion: dedup, capacity eviction, ordered insert.

use std::collections::HashSet;

use tracing::{debug, info};

use super::manager::{QueueError, QuestionQueue};
use super::validation;
use crate::config::{Settings, DEDUP_WINDOW_MS, RETENTION_MS};
use crate::protocol::{next_id, now_ms, Question, QuestionStatus};

/// Result of a batched ingestion.
#[derive(Debug, Default, Clone)]
pub struct IngestOutcome {
    pub added: Vec<u64>,
    pub duplicates: usize,
    pub rejected: usize,
}

impl QuestionQueue {
    /// Add one question. Returns the new id, or `None` when the text
    /// deduplicates against a recent entry (a no-op, not an error).
    pub async fn add_question(
        &self,
        text: &str,
        received_at: u64,
    ) -> Result<Option<u64>, QueueError> {
        let settings = Settings::load(&self.store).await?;
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let id = insert_question(&mut queue, &settings, text, received_at)?;
                if let Some(id) = id {
                    self.persist(&queue).await?;
                    debug!(question_id = id, queue_len = queue.len(), "Question added");
                }
                Ok(id)
            })
            .await
    }

    /// Add many observed items under one lock acquisition and one
    /// persisted rewrite. Individual validation failures are counted,
    /// not fatal.
    pub async fn add_batch(
        &self,
        items: Vec<(String, u64)>,
    ) -> Result<IngestOutcome, QueueError> {
        let settings = Settings::load(&self.store).await?;
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let mut outcome = IngestOutcome::default();

                for (text, received_at) in &items {
                    match insert_question(&mut queue, &settings, text, *received_at) {
                        Ok(Some(id)) => outcome.added.push(id),
                        Ok(None) => outcome.duplicates += 1,
                        Err(QueueError::Storage(e)) => return Err(QueueError::Storage(e)),
                        Err(_) => outcome.rejected += 1,
                    }
                }

                if !outcome.added.is_empty() {
                    self.persist(&queue).await?;
                }
                info!(
                    added = outcome.added.len(),
                    duplicates = outcome.duplicates,
                    rejected = outcome.rejected,
                    "Ingested incoming items"
                );
                Ok(outcome)
            })
            .await
    }
}

fn insert_question(
    queue: &mut Vec<Question>,
    settings: &Settings,
    text: &str,
    received_at: u64,
) -> Result<Option<u64>, QueueError> {
    let text = validation::validate_text(text)?;
    let normalized = validation::normalize_text(&text);

    // Soft dedup: skipped entries may be asked again, everything else
    // blocks an identical question inside the window.
    let duplicate = queue.iter().any(|q| {
        q.status != QuestionStatus::Skipped
            && received_at.abs_diff(q.received_at) < DEDUP_WINDOW_MS
            && validation::normalize_text(&q.text) == normalized
    });
    if duplicate {
        debug!("Duplicate question dropped");
        return Ok(None);
    }

    if queue.len() >= settings.max_queue_size {
        let needed = queue.len() + 1 - settings.max_queue_size;
        evict_old_terminal(queue, needed);
        if queue.len() >= settings.max_queue_size {
            return Err(QueueError::QueueFull);
        }
    }

    let id = next_id();
    queue.push(Question::new(id, text, received_at));
    // Stable sort: equal timestamps keep insertion order.
    queue.sort_by_key(|q| q.received_at);
    Ok(Some(id))
}

/// Evict up to `needed` terminal entries older than the retention
/// window, oldest first.
fn evict_old_terminal(queue: &mut Vec<Question>, needed: usize) {
    let now = now_ms();
    let mut victims: Vec<(u64, u64)> = queue
        .iter()
        .filter_map(|q| {
            q.terminated_at()
                .filter(|t| now.saturating_sub(*t) > RETENTION_MS)
                .map(|t| (t, q.id))
        })
        .collect();
    if victims.is_empty() {
        return;
    }
    victims.sort_unstable();

    let evicted: HashSet<u64> = victims.into_iter().take(needed).map(|(_, id)| id).collect();
    queue.retain(|q| !evicted.contains(&q.id));
    info!(count = evicted.len(), "Evicted old terminal questions");
}
