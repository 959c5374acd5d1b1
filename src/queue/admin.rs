//! Delete, clear, stats, and snapshot operations.

use tracing::info;

use super::manager::{QueueError, QuestionQueue};
use crate::protocol::{Question, QuestionStatus, QueueStats};

impl QuestionQueue {
    /// Remove a question outright. Returns `false` when the id is
    /// unknown.
    pub async fn delete_question(&self, id: u64) -> Result<bool, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let before = queue.len();
                queue.retain(|q| q.id != id);
                if queue.len() == before {
                    return Ok(false);
                }
                self.persist(&queue).await?;
                info!(question_id = id, "Question deleted");
                Ok(true)
            })
            .await
    }

    /// Clear pending and next entries; `include_sent` also drops the
    /// terminal history. Returns the number of removed entries.
    pub async fn clear_queue(&self, include_sent: bool) -> Result<usize, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let before = queue.len();
                if include_sent {
                    queue.clear();
                } else {
                    queue.retain(|q| q.is_terminal());
                }
                let removed = before - queue.len();
                if removed > 0 {
                    self.persist(&queue).await?;
                }
                info!(removed, include_sent, "Queue cleared");
                Ok(removed)
            })
            .await
    }

    /// Per-status counts plus pending-age bounds.
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let queue = self.load().await?;
                let mut stats = QueueStats {
                    total: queue.len(),
                    ..QueueStats::default()
                };
                for q in &queue {
                    match q.status {
                        QuestionStatus::Pending => {
                            stats.pending += 1;
                            stats.oldest_pending = Some(
                                stats
                                    .oldest_pending
                                    .map_or(q.received_at, |t| t.min(q.received_at)),
                            );
                            stats.newest_pending = Some(
                                stats
                                    .newest_pending
                                    .map_or(q.received_at, |t| t.max(q.received_at)),
                            );
                        }
                        QuestionStatus::Next => stats.next += 1,
                        QuestionStatus::Sent => stats.sent += 1,
                        QuestionStatus::Skipped => stats.skipped += 1,
                    }
                }
                Ok(stats)
            })
            .await
    }

    /// Defensive copy of the whole queue, ordered by `received_at`.
    pub async fn snapshot(&self) -> Result<Vec<Question>, QueueError> {
        self.mutex.with_lock(|| async move { self.load().await }).await
    }
}
