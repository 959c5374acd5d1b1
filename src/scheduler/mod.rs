//! Timer-driven posting scheduler.
//!
//! ## Module Organization
//!
//! - `mod.rs` - Scheduler struct, lifecycle (start/stop/pause/resume),
//!   interval updates, manual triggers, status reporting
//! - `tick.rs` - The per-tick posting algorithm and failure handling
//! - `upkeep.rs` - Tick loop, self-healing health check, memory upkeep
//!
//! The scheduler is the single place that decides retry vs. skip vs.
//! surface-to-user for posting failures.

mod tick;
mod upkeep;


use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::{keys, Settings, MIN_POST_INTERVAL_SECS, MIN_TRIGGER_SPACING_SECS};
use crate::notify::Notifier;
use crate::poster::PostClient;
use crate::protocol::{now_ms, PostStats, SchedulerStatus};
use crate::queue::{QueueError, QuestionQueue};
use crate::store::{CachedStore, StorageError};

/// Scheduler operation error.
#[derive(Debug)]
pub enum SchedulerError {
    /// Interval below the allowed minimum.
    IntervalTooShort(u64),
    /// Manual post target does not exist or is not pending.
    UnknownQuestion(u64),
    Storage(StorageError),
    Queue(QueueError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::IntervalTooShort(secs) => write!(
                f,
                "interval {}s is below the {}s minimum",
                secs, MIN_POST_INTERVAL_SECS
            ),
            SchedulerError::UnknownQuestion(id) => {
                write!(f, "question {} not found or not pending", id)
            }
            SchedulerError::Storage(e) => write!(f, "storage error: {}", e),
            SchedulerError::Queue(e) => write!(f, "queue error: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<StorageError> for SchedulerError {
    fn from(e: StorageError) -> Self {
        SchedulerError::Storage(e)
    }
}

impl From<QueueError> for SchedulerError {
    fn from(e: QueueError) -> Self {
        SchedulerError::Queue(e)
    }
}

/// What caused a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
}

/// Result of one tick of the posting algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostOutcome {
    /// Scheduler stopped or paused; the timer tick was a no-op.
    Inactive,
    /// Nothing pending to post.
    NoQuestions,
    Posted { id: u64 },
    Skipped { id: u64, reason: String },
    /// Retryable failure; the question stays `next` for the next tick.
    Retrying { id: u64, retry_count: u32 },
    /// Credentials rejected; auto-posting paused until reconfigured.
    CredentialFailure { id: u64 },
    /// Manual trigger inside the minimum spacing window.
    Throttled { wait_secs: u64 },
}

pub(crate) struct SchedState {
    pub running: bool,
    pub paused: bool,
    pub interval: Duration,
    pub started_at: Option<Instant>,
    pub accumulated_uptime: Duration,
    pub last_post: Option<Instant>,
    pub last_post_at_ms: Option<u64>,
    pub next_tick_at_ms: Option<u64>,
    /// Server-requested rate-limit gate; timer ticks wait it out.
    pub rate_limited_until: Option<Instant>,
    pub total_posts: u64,
    pub successful_posts: u64,
    pub failed_posts: u64,
}

#[derive(Default)]
pub(crate) struct Tasks {
    pub tick: Option<tokio::task::JoinHandle<()>>,
    pub health: Option<tokio::task::JoinHandle<()>>,
    pub upkeep: Option<tokio::task::JoinHandle<()>>,
}

/// Orchestrates periodic posting with retry, backoff, and self-healing.
pub struct Scheduler {
    pub(crate) queue: Arc<QuestionQueue>,
    pub(crate) poster: Arc<dyn PostClient>,
    pub(crate) store: Arc<CachedStore>,
    pub(crate) notifier: Arc<Notifier>,
    pub(crate) post_target: String,
    pub(crate) state: Mutex<SchedState>,
    pub(crate) tasks: Mutex<Tasks>,
    /// Wakes the background loops on stop and interval changes.
    pub(crate) wake: Notify,
}

impl Scheduler {
    pub fn new(
        queue: Arc<QuestionQueue>,
        poster: Arc<dyn PostClient>,
        store: Arc<CachedStore>,
        notifier: Arc<Notifier>,
        post_target: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            poster,
            store,
            notifier,
            post_target,
            state: Mutex::new(SchedState {
                running: false,
                paused: false,
                interval: Duration::from_secs(MIN_POST_INTERVAL_SECS),
                started_at: None,
                accumulated_uptime: Duration::ZERO,
                last_post: None,
                last_post_at_ms: None,
                next_tick_at_ms: None,
                rate_limited_until: None,
                total_posts: 0,
                successful_posts: 0,
                failed_posts: 0,
            }),
            tasks: Mutex::new(Tasks::default()),
            wake: Notify::new(),
        })
    }

    /// Begin periodic posting. Persists the running flag so a restarted
    /// process resumes the schedule.
    pub async fn start_auto_posting(
        self: &Arc<Self>,
        interval_secs: u64,
        immediate: bool,
    ) -> Result<(), SchedulerError> {
        if interval_secs < MIN_POST_INTERVAL_SECS {
            return Err(SchedulerError::IntervalTooShort(interval_secs));
        }
        let interval = Duration::from_secs(interval_secs);

        let already_running = {
            let mut state = self.state.lock();
            let was = state.running;
            state.running = true;
            state.paused = false;
            state.interval = interval;
            if !was {
                state.started_at = Some(Instant::now());
            }
            was
        };

        self.store.set(keys::IS_RUNNING, &true).await?;
        self.store
            .set(keys::POST_INTERVAL_SEC, &interval_secs)
            .await?;

        if already_running {
            // Timer recreated in place; no new loops.
            self.wake.notify_waiters();
            info!(interval_secs, "Auto-posting interval updated (already running)");
            return Ok(());
        }

        info!(interval_secs, immediate, "Auto-posting started");
        self.spawn_loops(immediate);
        Ok(())
    }

    /// Stop periodic posting and persist the stopped state.
    pub async fn stop_auto_posting(&self) -> Result<(), SchedulerError> {
        self.halt();
        self.store.set(keys::IS_RUNNING, &false).await?;
        info!("Auto-posting stopped");
        Ok(())
    }

    /// Stop the loops without touching the persisted running flag.
    /// Used on process shutdown so the schedule resumes on restart.
    pub fn halt(&self) {
        {
            let mut state = self.state.lock();
            state.running = false;
            if let Some(started) = state.started_at.take() {
                state.accumulated_uptime += started.elapsed();
            }
            state.next_tick_at_ms = None;
        }
        self.wake.notify_waiters();
        let mut tasks = self.tasks.lock();
        tasks.tick = None;
        tasks.health = None;
        tasks.upkeep = None;
    }

    /// Suspend ticks without destroying the timer.
    pub fn pause_auto_posting(&self) {
        let mut state = self.state.lock();
        if state.running && !state.paused {
            state.paused = true;
            info!("Auto-posting paused");
        }
    }

    pub fn resume_auto_posting(&self) {
        let mut state = self.state.lock();
        if state.running && state.paused {
            state.paused = false;
            info!("Auto-posting resumed");
        }
    }

    /// Persist a new interval; the running timer is recreated.
    pub async fn update_interval(&self, interval_secs: u64) -> Result<(), SchedulerError> {
        if interval_secs < MIN_POST_INTERVAL_SECS {
            return Err(SchedulerError::IntervalTooShort(interval_secs));
        }
        self.store
            .set(keys::POST_INTERVAL_SEC, &interval_secs)
            .await?;

        let mut state = self.state.lock();
        state.interval = Duration::from_secs(interval_secs);
        let running = state.running;
        drop(state);
        if running {
            self.wake.notify_waiters();
        }
        info!(interval_secs, "Posting interval updated");
        Ok(())
    }

    /// Post now, bypassing the periodic timer but honoring the minimum
    /// spacing since the last post attempt.
    pub async fn trigger_immediate_post(&self) -> Result<PostOutcome, SchedulerError> {
        let spacing = Duration::from_secs(MIN_TRIGGER_SPACING_SECS);
        let wait = {
            let state = self.state.lock();
            state
                .last_post
                .map(|t| spacing.saturating_sub(t.elapsed()))
                .unwrap_or_default()
        };
        if !wait.is_zero() {
            warn!(wait_secs = wait.as_secs(), "Immediate post throttled");
            return Ok(PostOutcome::Throttled {
                wait_secs: wait.as_secs().max(1),
            });
        }
        self.handle_post(Trigger::Manual).await
    }

    /// Manual post: optionally promote a specific question first.
    pub async fn manual_post(
        &self,
        question_id: Option<u64>,
    ) -> Result<PostOutcome, SchedulerError> {
        if let Some(id) = question_id {
            if !self.queue.set_as_next(id).await? {
                return Err(SchedulerError::UnknownQuestion(id));
            }
        }
        self.trigger_immediate_post().await
    }

    /// Resume auto-posting if a previous process persisted the running
    /// flag. Returns whether posting was resumed.
    pub async fn resume_if_persisted(self: &Arc<Self>) -> Result<bool, SchedulerError> {
        let was_running: bool = self.store.get_or(keys::IS_RUNNING, false).await?;
        if !was_running {
            return Ok(false);
        }
        let settings = Settings::load(&self.store).await?;
        let interval_secs = settings.post_interval_secs.max(MIN_POST_INTERVAL_SECS);
        info!(interval_secs, "Resuming auto-posting from persisted state");
        self.start_auto_posting(interval_secs, false).await?;
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub(crate) fn is_active(&self) -> bool {
        let state = self.state.lock();
        state.running && !state.paused
    }

    /// Remaining server-requested rate-limit delay, if one is in effect.
    pub fn rate_limit_remaining(&self) -> Option<Duration> {
        let state = self.state.lock();
        state
            .rate_limited_until
            .and_then(|until| until.checked_duration_since(Instant::now()))
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock();
        let uptime = state.accumulated_uptime
            + state
                .started_at
                .map(|t| t.elapsed())
                .unwrap_or(Duration::ZERO);
        SchedulerStatus {
            is_running: state.running,
            is_paused: state.paused,
            interval_secs: state.interval.as_secs(),
            stats: PostStats {
                total_posts: state.total_posts,
                successful_posts: state.successful_posts,
                failed_posts: state.failed_posts,
                uptime_secs: uptime.as_secs(),
            },
            next_post_estimate: if state.running && !state.paused {
                state.next_tick_at_ms
            } else {
                None
            },
            last_post_at: state.last_post_at_ms,
        }
    }

    pub(crate) fn record_post_attempt(&self, success: bool) {
        let mut state = self.state.lock();
        state.total_posts += 1;
        if success {
            state.successful_posts += 1;
        } else {
            state.failed_posts += 1;
        }
        state.last_post = Some(Instant::now());
        state.last_post_at_ms = Some(now_ms());
    }
}
