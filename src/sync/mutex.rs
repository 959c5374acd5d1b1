//! Fair async mutex with FIFO waiter ordering and observability counters.
//!
//! Every queue mutation serializes through one `FairMutex`. Acquisition is
//! scoped: the guard releases on drop, so the lock is freed whether the
//! guarded operation succeeds, errors, or panics. The mutex is not
//! re-entrant — a locked operation must never acquire the same instance
//! again or it deadlocks on itself.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

struct LockState {
    locked: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

#[derive(Default)]
struct LockStats {
    acquires: AtomicU64,
    releases: AtomicU64,
    max_waiters: AtomicUsize,
}

/// Exclusive critical-section primitive with FIFO waiter ordering.
pub struct FairMutex {
    state: Mutex<LockState>,
    stats: LockStats,
}

impl Default for FairMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl FairMutex {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                locked: false,
                waiters: VecDeque::new(),
            }),
            stats: LockStats::default(),
        }
    }

    /// Acquire the lock, queueing FIFO behind current waiters if held.
    pub async fn acquire(&self) -> FairMutexGuard<'_> {
        let waiter = {
            let mut state = self.state.lock();
            if !state.locked {
                state.locked = true;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                let depth = state.waiters.len();
                if depth > self.stats.max_waiters.load(Ordering::Relaxed) {
                    self.stats.max_waiters.store(depth, Ordering::Relaxed);
                }
                Some(rx)
            }
        };

        if let Some(rx) = waiter {
            // Handoff: release() keeps `locked` set and transfers ownership
            // to exactly one woken waiter, preserving arrival order.
            let _ = rx.await;
        }

        self.stats.acquires.fetch_add(1, Ordering::Relaxed);
        FairMutexGuard { mutex: self }
    }

    /// Acquire, run `op`, and release when it completes — on success or
    /// failure alike.
    pub async fn with_lock<T, F, Fut>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire().await;
        op().await
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        if !state.locked {
            // A release without a matching acquire is a logic bug, not a
            // recoverable condition.
            drop(state);
            panic!("FairMutex released while unlocked");
        }
        self.stats.releases.fetch_add(1, Ordering::Relaxed);
        // Skip waiters whose acquire future was dropped while queued.
        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return;
            }
        }
        state.locked = false;
    }

    /// Number of callers currently queued behind the holder.
    pub fn queue_depth(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    pub fn acquire_count(&self) -> u64 {
        self.stats.acquires.load(Ordering::Relaxed)
    }

    pub fn release_count(&self) -> u64 {
        self.stats.releases.load(Ordering::Relaxed)
    }

    /// Maximum observed waiter queue depth.
    pub fn max_queue_depth(&self) -> usize {
        self.stats.max_waiters.load(Ordering::Relaxed)
    }
}

/// RAII guard for [`FairMutex`]; releases on drop.
pub struct FairMutexGuard<'a> {
    mutex: &'a FairMutex,
}

impl Drop for FairMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_exclusive_access() {
        let mutex = FairMutex::new();
        let guard = mutex.acquire().await;
        assert!(mutex.is_locked());
        drop(guard);
        assert!(!mutex.is_locked());
        assert_eq!(mutex.acquire_count(), 1);
        assert_eq!(mutex.release_count(), 1);
    }

    #[tokio::test]
    async fn test_fifo_ordering() {
        let mutex = Arc::new(FairMutex::new());
        let order: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        let guard = mutex.acquire().await;

        let mut handles = Vec::new();
        for i in 0..5usize {
            let task_mutex = Arc::clone(&mutex);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = task_mutex.acquire().await;
                order.lock().push(i);
            }));
            // Let each waiter enqueue before spawning the next.
            while mutex.queue_depth() <= i {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(mutex.queue_depth(), 5);
        assert_eq!(mutex.max_queue_depth(), 5);
        drop(guard);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_panic() {
        let mutex = Arc::new(FairMutex::new());
        let m = Arc::clone(&mutex);
        let result = tokio::spawn(async move {
            m.with_lock(|| async { panic!("boom") }).await;
        })
        .await;
        assert!(result.is_err());
        assert!(!mutex.is_locked());

        // Still usable afterwards.
        let value = mutex.with_lock(|| async { 42 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_counter_increments_under_contention() {
        let mutex = Arc::new(FairMutex::new());
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let mutex = Arc::clone(&mutex);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                mutex
                    .with_lock(|| async move {
                        let mut c = counter.lock();
                        *c += 1;
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*counter.lock(), 50);
        assert_eq!(mutex.acquire_count(), 50);
        assert_eq!(mutex.release_count(), 50);
    }
}
