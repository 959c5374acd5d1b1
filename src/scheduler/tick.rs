//! The per-tick posting algorithm.

use std::time::{Duration, Instant};

use tracing::debug;

use super::{PostOutcome, Scheduler, SchedulerError, Trigger};
use crate::config::Settings;
use crate::notify::Severity;
use crate::poster::PostError;
use crate::queue::validation;

impl Scheduler {
    /// One tick: select the next question, filter it, post it, and
    /// settle its status from the outcome.
    pub(crate) async fn handle_post(&self, trigger: Trigger) -> Result<PostOutcome, SchedulerError> {
        if trigger == Trigger::Timer {
            if !self.is_active() {
                return Ok(PostOutcome::Inactive);
            }
            // Wait out a server-requested rate-limit delay before the
            // next timer attempt; manual triggers may override it.
            if let Some(remaining) = self.rate_limit_remaining() {
                debug!(
                    wait_secs = remaining.as_secs(),
                    "Rate-limit delay still in effect, skipping tick"
                );
                return Ok(PostOutcome::Throttled {
                    wait_secs: remaining.as_secs().max(1),
                });
            }
        }

        let settings = Settings::load(&self.store).await?;

        let Some(question) = self.queue.get_next_question().await? else {
            debug!("No pending questions to post");
            return Ok(PostOutcome::NoQuestions);
        };

        let text = format!("{}{}", settings.question_prefix, question.text);

        if let Some(keyword) = validation::matching_ng_keyword(&text, &settings.ng_keywords) {
            self.queue.mark_as_skipped(question.id, "NG content").await?;
            self.notifier.warning(format!(
                "Question {} skipped: blocked keyword \"{}\"",
                question.id, keyword
            ));
            return Ok(PostOutcome::Skipped {
                id: question.id,
                reason: "NG content".to_string(),
            });
        }

        match self.poster.post(&self.post_target, &text).await {
            Ok(()) => {
                self.record_post_attempt(true);
                self.queue.mark_as_sent(question.id).await?;
                {
                    let mut state = self.state.lock();
                    state.rate_limited_until = None;
                }
                self.notifier.info(format!("Posted question {}", question.id));
                Ok(PostOutcome::Posted { id: question.id })
            }
            Err(e) => {
                self.record_post_attempt(false);
                self.settle_failure(question.id, e, settings.max_retry_attempts)
                    .await
            }
        }
    }

    /// Decide retry vs. skip vs. surface-to-user for a failed post.
    /// Non-retryable errors are never retried; retryable ones keep the
    /// question `next` until the attempt budget is exhausted.
    async fn settle_failure(
        &self,
        id: u64,
        error: PostError,
        max_retries: u32,
    ) -> Result<PostOutcome, SchedulerError> {
        match &error {
            PostError::Auth(_) | PostError::Permission(_) => {
                self.pause_auto_posting();
                self.notifier.emit(
                    Severity::Error,
                    true,
                    format!(
                        "Posting credentials rejected ({}); auto-posting paused until reconfigured",
                        error
                    ),
                );
                Ok(PostOutcome::CredentialFailure { id })
            }
            PostError::BadRequest(_) => {
                let reason = format!("rejected by platform: {}", error);
                self.queue.mark_as_skipped(id, &reason).await?;
                self.notifier
                    .warning(format!("Question {} skipped: {}", id, error));
                Ok(PostOutcome::Skipped { id, reason })
            }
            PostError::RateLimited { retry_after_secs } => {
                {
                    let mut state = self.state.lock();
                    state.rate_limited_until =
                        Some(Instant::now() + Duration::from_secs(*retry_after_secs));
                }
                self.settle_retryable(id, &error, max_retries).await
            }
            PostError::Network(_) => self.settle_retryable(id, &error, max_retries).await,
        }
    }

    async fn settle_retryable(
        &self,
        id: u64,
        error: &PostError,
        max_retries: u32,
    ) -> Result<PostOutcome, SchedulerError> {
        let retry_count = self.queue.bump_retry(id).await?.unwrap_or(0);
        if retry_count > max_retries {
            let reason = "retry attempts exhausted".to_string();
            self.queue.mark_as_skipped(id, &reason).await?;
            self.notifier.emit(
                Severity::Error,
                false,
                format!(
                    "Question {} skipped after {} failed attempts (last error: {})",
                    id, retry_count, error
                ),
            );
            Ok(PostOutcome::Skipped { id, reason })
        } else {
            self.notifier.warning(format!(
                "Post attempt for question {} failed ({}); retrying on a later tick ({}/{})",
                id, error, retry_count, max_retries
            ));
            Ok(PostOutcome::Retrying { id, retry_count })
        }
    }
}
