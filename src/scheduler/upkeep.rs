//! Background loops: the tick timer, the self-healing health check,
//! and memory upkeep.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::{Scheduler, Trigger};
use crate::protocol::now_ms;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const UPKEEP_INTERVAL: Duration = Duration::from_secs(60);
const IMMEDIATE_POST_DELAY: Duration = Duration::from_secs(2);

/// Transient notifications older than this are dropped by upkeep.
const NOTIFICATION_MAX_AGE_MS: u64 = 60 * 60 * 1000;

impl Scheduler {
    /// Spawn the tick, health-check, and upkeep loops, plus an optional
    /// one-shot immediate post.
    pub(crate) fn spawn_loops(self: &Arc<Self>, immediate: bool) {
        let mut tasks = self.tasks.lock();

        let scheduler = Arc::clone(self);
        tasks.tick = Some(tokio::spawn(async move {
            scheduler.run_tick_loop().await;
        }));

        let scheduler = Arc::clone(self);
        tasks.health = Some(tokio::spawn(async move {
            scheduler.run_health_loop().await;
        }));

        let scheduler = Arc::clone(self);
        tasks.upkeep = Some(tokio::spawn(async move {
            scheduler.run_upkeep_loop().await;
        }));

        if immediate {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(IMMEDIATE_POST_DELAY).await;
                if scheduler.is_active() {
                    let _ = scheduler.handle_post(Trigger::Timer).await;
                }
            });
        }
    }

    /// The periodic timer. Re-reads the interval every cycle so
    /// `update_interval` takes effect by waking the loop.
    async fn run_tick_loop(self: Arc<Self>) {
        info!("Tick loop started");
        loop {
            let interval = {
                let mut state = self.state.lock();
                if !state.running {
                    break;
                }
                state.next_tick_at_ms = Some(now_ms() + state.interval.as_millis() as u64);
                state.interval
            };

            tokio::select! {
                _ = self.wake.notified() => {
                    // Stop or interval change; re-check at the loop top.
                    continue;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            if !self.is_running() {
                break;
            }
            if self.is_paused() {
                continue;
            }
            if let Err(e) = self.handle_post(Trigger::Timer).await {
                warn!(error = %e, "Scheduled post failed");
            }
        }
        debug!("Tick loop exited");
    }

    /// Self-healing: if the tick task died while the scheduler believes
    /// it is running, recreate it.
    async fn run_health_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(HEALTH_CHECK_INTERVAL) => {}
            }
            if !self.is_running() {
                break;
            }
            self.ensure_tick_alive();
        }
        debug!("Health loop exited");
    }

    /// Recreate the tick task if it is gone. Returns whether a respawn
    /// happened.
    pub(crate) fn ensure_tick_alive(self: &Arc<Self>) -> bool {
        let mut tasks = self.tasks.lock();
        let dead = tasks
            .tick
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true);
        if !dead {
            return false;
        }
        warn!("Tick timer task missing while running; recreating");
        let scheduler = Arc::clone(self);
        tasks.tick = Some(tokio::spawn(async move {
            scheduler.run_tick_loop().await;
        }));
        true
    }

    /// Best-effort memory upkeep: expired cache entries and stale
    /// transient notifications.
    async fn run_upkeep_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(UPKEEP_INTERVAL) => {}
            }
            if !self.is_running() {
                break;
            }
            let purged = self.store.purge_expired();
            let trimmed = self.notifier.trim_transient(NOTIFICATION_MAX_AGE_MS);
            if purged > 0 || trimmed > 0 {
                debug!(purged, trimmed, "Upkeep pass");
            }
        }
        debug!("Upkeep loop exited");
    }
}
