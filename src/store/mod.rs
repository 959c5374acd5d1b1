//! Cache-backed persistent store.
//!
//! A read-through TTL cache over the SQLite backend. Writes update the
//! cache synchronously and land in a pending-write set; a background
//! debounce loop coalesces them into one batched backing-store
//! transaction. `remove` bypasses batching and hits the backend
//! immediately.
//!
//! Trade-off: up to one debounce window of writes can be lost on crash.

mod sqlite;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info};

pub use sqlite::{SqliteBackend, StorageError};

/// Pending-write count that forces an early flush.
const FLUSH_BATCH_THRESHOLD: usize = 64;

/// Store tuning knobs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cache entry lifetime.
    pub ttl: Duration,
    /// Quiet period before pending writes are flushed.
    pub debounce: Duration,
    /// Maximum cached entries; the oldest-inserted entry is evicted
    /// beyond this (FIFO, not LRU).
    pub max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            debounce: Duration::from_millis(100),
            max_entries: 128,
        }
    }
}

/// Store counters, exposed through the status endpoint.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub batches_flushed: AtomicU64,
    pub writes_flushed: AtomicU64,
    pub evictions: AtomicU64,
}

struct CacheEntry {
    bytes: Vec<u8>,
    inserted_at: Instant,
    seq: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order; stale (seq, key) pairs are skipped on eviction.
    order: VecDeque<(u64, String)>,
    dirty: HashMap<String, Vec<u8>>,
    next_seq: u64,
}

/// Read-through cache over [`SqliteBackend`] with debounced batch writes.
pub struct CachedStore {
    backend: Arc<SqliteBackend>,
    inner: Mutex<CacheInner>,
    notify: Notify,
    config: StoreConfig,
    stats: StoreStats,
    running: AtomicBool,
    shutdown_complete: Notify,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(value).map_err(|e| StorageError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}

impl CachedStore {
    pub fn new(backend: Arc<SqliteBackend>, config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            backend,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                dirty: HashMap::new(),
                next_seq: 0,
            }),
            notify: Notify::new(),
            config,
            stats: StoreStats::default(),
            running: AtomicBool::new(true),
            shutdown_complete: Notify::new(),
        })
    }

    /// Start the background flush loop.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            store.run_flush_loop().await;
        })
    }

    /// Read a value, serving from cache while the entry is younger than
    /// the TTL, otherwise reading through to the backend.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        {
            let inner = self.inner.lock();
            if let Some(entry) = inner.entries.get(key) {
                if entry.inserted_at.elapsed() < self.config.ttl {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return decode(&entry.bytes).map(Some);
                }
            }
            // A pending write is newer than anything the backend holds.
            if let Some(bytes) = inner.dirty.get(key) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return decode(bytes).map(Some);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        match self.backend.get_raw(key)? {
            Some(bytes) => {
                self.insert_cache(key, bytes.clone());
                decode(&bytes).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Read a value, falling back to `default` when the key is absent.
    pub async fn get_or<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, StorageError> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Batched raw read: cache-fresh keys are served locally, the rest
    /// are fetched from the backend in one round trip.
    pub async fn get_many_raw(
        &self,
        keys: &[&str],
    ) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        {
            let inner = self.inner.lock();
            for key in keys {
                if let Some(entry) = inner.entries.get(*key) {
                    if entry.inserted_at.elapsed() < self.config.ttl {
                        self.stats.hits.fetch_add(1, Ordering::Relaxed);
                        found.insert((*key).to_string(), entry.bytes.clone());
                        continue;
                    }
                }
                if let Some(bytes) = inner.dirty.get(*key) {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    found.insert((*key).to_string(), bytes.clone());
                    continue;
                }
                missing.push(*key);
            }
        }

        if !missing.is_empty() {
            self.stats
                .misses
                .fetch_add(missing.len() as u64, Ordering::Relaxed);
            for (key, bytes) in self.backend.get_many_raw(&missing)? {
                self.insert_cache(&key, bytes.clone());
                found.insert(key, bytes);
            }
        }
        Ok(found)
    }

    /// Update the cache synchronously and schedule a debounced write.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = encode(value)?;
        let pending = {
            let mut inner = self.inner.lock();
            Self::insert_cache_locked(&mut inner, &self.config, &self.stats, key, bytes.clone());
            inner.dirty.insert(key.to_string(), bytes);
            inner.dirty.len()
        };
        if pending >= FLUSH_BATCH_THRESHOLD {
            self.notify.notify_one();
        }
        Ok(())
    }

    /// Batched variant of [`set`](Self::set) for heterogeneous values.
    pub async fn set_many_raw(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StorageError> {
        let pending = {
            let mut inner = self.inner.lock();
            for (key, bytes) in entries {
                Self::insert_cache_locked(
                    &mut inner,
                    &self.config,
                    &self.stats,
                    &key,
                    bytes.clone(),
                );
                inner.dirty.insert(key, bytes);
            }
            inner.dirty.len()
        };
        if pending >= FLUSH_BATCH_THRESHOLD {
            self.notify.notify_one();
        }
        Ok(())
    }

    /// Evict from cache and backend immediately, bypassing batching.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        {
            let mut inner = self.inner.lock();
            inner.entries.remove(key);
            inner.dirty.remove(key);
        }
        self.backend.remove(key)
    }

    /// Drop a cached entry after an external writer changed the backing
    /// store; the next `get` re-reads.
    pub fn invalidate(&self, key: &str) {
        self.inner.lock().entries.remove(key);
    }

    /// Force pending writes to the backend now.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let batch: Vec<(String, Vec<u8>)> = {
            let mut inner = self.inner.lock();
            inner.dirty.drain().collect()
        };
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        match self.backend.set_many_raw(&batch) {
            Ok(()) => {
                self.stats.batches_flushed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .writes_flushed
                    .fetch_add(count as u64, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                // Keep the data; it will be retried on the next flush.
                let mut inner = self.inner.lock();
                for (key, bytes) in batch {
                    inner.dirty.entry(key).or_insert(bytes);
                }
                Err(e)
            }
        }
    }

    /// Drop cache entries past their TTL. Called by the upkeep loop.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.config.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        before - inner.entries.len()
    }

    /// Stop the flush loop, flushing the remaining writes first.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_one();
        tokio::select! {
            _ = self.shutdown_complete.notified() => {
                info!("Store flush loop shutdown complete");
            }
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                error!("Store flush loop shutdown timeout");
            }
        }
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn cache_len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn pending_writes(&self) -> usize {
        self.inner.lock().dirty.len()
    }

    fn insert_cache(&self, key: &str, bytes: Vec<u8>) {
        let mut inner = self.inner.lock();
        Self::insert_cache_locked(&mut inner, &self.config, &self.stats, key, bytes);
    }

    fn insert_cache_locked(
        inner: &mut CacheInner,
        config: &StoreConfig,
        stats: &StoreStats,
        key: &str,
        bytes: Vec<u8>,
    ) {
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                bytes,
                inserted_at: Instant::now(),
                seq,
            },
        );
        inner.order.push_back((seq, key.to_string()));

        while inner.entries.len() > config.max_entries {
            // Skip stale order records left behind by overwrites.
            match inner.order.pop_front() {
                Some((old_seq, old_key)) => {
                    if inner.entries.get(&old_key).map(|e| e.seq) == Some(old_seq) {
                        inner.entries.remove(&old_key);
                        stats.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }

    async fn run_flush_loop(&self) {
        debug!(
            debounce_ms = self.config.debounce.as_millis() as u64,
            "Store flush loop started"
        );
        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.config.debounce) => {}
            }
            if let Err(e) = self.flush().await {
                error!(error = %e, "Failed to flush pending writes");
            }
        }

        if let Err(e) = self.flush().await {
            error!(error = %e, "Failed to flush on shutdown");
        }
        self.backend.checkpoint();
        self.shutdown_complete.notify_one();
    }
}
