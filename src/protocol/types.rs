//! Core data model for postQ.
//!
//! Contains Question, QuestionStatus, and the status/stats structures
//! exposed through the control plane.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============== Timestamps ==============

/// Current unix timestamp in milliseconds.
#[inline(always)]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ============== Question IDs ==============

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocate the next question id.
#[inline]
pub fn next_id() -> u64 {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Set the id counter, used on startup to resume after the highest
/// persisted id.
pub fn set_id_counter(next: u64) {
    ID_COUNTER.store(next.max(1), Ordering::Relaxed);
}

// ============== Question ==============

/// Question lifecycle state.
///
/// `Sent` and `Skipped` are terminal; entries in those states are only
/// touched again by eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    /// Waiting in the queue.
    Pending,
    /// Earmarked for the upcoming post attempt. At most one question
    /// holds this state at any time.
    Next,
    /// Successfully posted.
    Sent,
    /// Given up on, with a reason.
    Skipped,
}

impl QuestionStatus {
    #[inline(always)]
    pub fn is_terminal(self) -> bool {
        matches!(self, QuestionStatus::Sent | QuestionStatus::Skipped)
    }
}

/// A unit of work: text to be posted, with its lifecycle bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: u64,
    pub text: String,
    /// When the producer observed this question (unix ms).
    pub received_at: u64,
    pub status: QuestionStatus,
    /// When this entry was created in the queue (unix ms).
    pub created_at: u64,
    #[serde(default)]
    pub sent_at: Option<u64>,
    #[serde(default)]
    pub skipped_at: Option<u64>,
    #[serde(default)]
    pub skipped_reason: Option<String>,
    /// Failed post attempts since the last success.
    #[serde(default)]
    pub retry_count: u32,
    /// When this entry was promoted to `next` (unix ms).
    #[serde(default)]
    pub next_at: Option<u64>,
}

impl Question {
    pub fn new(id: u64, text: String, received_at: u64) -> Self {
        Self {
            id,
            text,
            received_at,
            status: QuestionStatus::Pending,
            created_at: now_ms(),
            sent_at: None,
            skipped_at: None,
            skipped_reason: None,
            retry_count: 0,
            next_at: None,
        }
    }

    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Terminal timestamp used for retention decisions.
    #[inline]
    pub fn terminated_at(&self) -> Option<u64> {
        match self.status {
            QuestionStatus::Sent => self.sent_at,
            QuestionStatus::Skipped => self.skipped_at,
            _ => None,
        }
    }
}

// ============== Reporting ==============

/// Per-status queue counts plus pending-age bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub next: usize,
    pub sent: usize,
    pub skipped: usize,
    #[serde(default)]
    pub oldest_pending: Option<u64>,
    #[serde(default)]
    pub newest_pending: Option<u64>,
}

/// Posting counters accumulated across start/stop cycles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct PostStats {
    pub total_posts: u64,
    pub successful_posts: u64,
    pub failed_posts: u64,
    /// Accumulated running time in seconds.
    pub uptime_secs: u64,
}

/// Scheduler status as reported by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub is_paused: bool,
    pub interval_secs: u64,
    pub stats: PostStats,
    /// Estimated unix ms of the next periodic post, if running.
    #[serde(default)]
    pub next_post_estimate: Option<u64>,
    /// Unix ms of the last completed post attempt.
    #[serde(default)]
    pub last_post_at: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_counter_resume() {
        let base = next_id() + 1000;
        set_id_counter(base);
        assert!(next_id() >= base);
    }

    #[test]
    fn test_terminal_states() {
        let mut q = Question::new(1, "hello".to_string(), now_ms());
        assert!(!q.is_terminal());
        q.status = QuestionStatus::Sent;
        q.sent_at = Some(now_ms());
        assert!(q.is_terminal());
        assert_eq!(q.terminated_at(), q.sent_at);
    }
}
