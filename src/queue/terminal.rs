//! Terminal-state transitions and retry bookkeeping.

use tracing::{info, warn};

use super::manager::{QueueError, QuestionQueue};
use crate::protocol::{now_ms, QuestionStatus};

impl QuestionQueue {
    /// Transition `id` to `sent`. Resets the retry counter. Returns
    /// `false` when the id is unknown or already terminal.
    pub async fn mark_as_sent(&self, id: u64) -> Result<bool, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let Some(q) = queue.iter_mut().find(|q| q.id == id) else {
                    return Ok(false);
                };
                if q.is_terminal() {
                    return Ok(false);
                }
                q.status = QuestionStatus::Sent;
                q.sent_at = Some(now_ms());
                q.retry_count = 0;
                q.next_at = None;
                self.persist(&queue).await?;
                info!(question_id = id, "Question marked as sent");
                Ok(true)
            })
            .await
    }

    /// Transition `id` to `skipped` with a reason. Returns `false` when
    /// the id is unknown or already terminal.
    pub async fn mark_as_skipped(&self, id: u64, reason: &str) -> Result<bool, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let Some(q) = queue.iter_mut().find(|q| q.id == id) else {
                    return Ok(false);
                };
                if q.is_terminal() {
                    return Ok(false);
                }
                q.status = QuestionStatus::Skipped;
                q.skipped_at = Some(now_ms());
                q.skipped_reason = Some(reason.to_string());
                q.next_at = None;
                self.persist(&queue).await?;
                warn!(question_id = id, reason = %reason, "Question skipped");
                Ok(true)
            })
            .await
    }

    /// Record one failed post attempt, returning the new count. `None`
    /// when the id is unknown or terminal.
    pub async fn bump_retry(&self, id: u64) -> Result<Option<u32>, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;
                let Some(q) = queue.iter_mut().find(|q| q.id == id) else {
                    return Ok(None);
                };
                if q.is_terminal() {
                    return Ok(None);
                }
                q.retry_count += 1;
                let count = q.retry_count;
                self.persist(&queue).await?;
                Ok(Some(count))
            })
            .await
    }
}
