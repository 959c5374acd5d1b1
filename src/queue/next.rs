//! Next-question selection and explicit promotion.

use tracing::{debug, info};

use super::manager::{QueueError, QuestionQueue};
use crate::protocol::{now_ms, Question, QuestionStatus};

impl QuestionQueue {
    /// Return the question earmarked for the upcoming post.
    ///
    /// Idempotent: an existing `next` entry is returned unchanged;
    /// otherwise the oldest pending question (by `received_at`) is
    /// promoted and persisted. `None` when nothing is pending.
    pub async fn get_next_question(&self) -> Result<Option<Question>, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;

                if let Some(q) = queue.iter().find(|q| q.status == QuestionStatus::Next) {
                    return Ok(Some(q.clone()));
                }

                let oldest = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| q.status == QuestionStatus::Pending)
                    .min_by_key(|(_, q)| q.received_at)
                    .map(|(idx, _)| idx);

                let Some(idx) = oldest else {
                    return Ok(None);
                };

                queue[idx].status = QuestionStatus::Next;
                queue[idx].next_at = Some(now_ms());
                let promoted = queue[idx].clone();
                self.persist(&queue).await?;
                debug!(question_id = promoted.id, "Promoted question to next");
                Ok(Some(promoted))
            })
            .await
    }

    /// Promote `id` to `next`, reverting any current `next` entry to
    /// pending. Returns `false` when the target is missing or not
    /// pending.
    pub async fn set_as_next(&self, id: u64) -> Result<bool, QueueError> {
        self.mutex
            .with_lock(|| async move {
                let mut queue = self.load().await?;

                let Some(target) = queue.iter().position(|q| q.id == id) else {
                    return Ok(false);
                };
                if queue[target].status != QuestionStatus::Pending {
                    return Ok(false);
                }

                for q in queue.iter_mut() {
                    if q.status == QuestionStatus::Next {
                        q.status = QuestionStatus::Pending;
                        q.next_at = None;
                    }
                }

                queue[target].status = QuestionStatus::Next;
                queue[target].next_at = Some(now_ms());
                self.persist(&queue).await?;
                info!(question_id = id, "Question explicitly set as next");
                Ok(true)
            })
            .await
    }
}
