//! QuestionQueue tests, split by concern.

mod capacity;
mod core;
mod dedup;
mod next;

use std::path::PathBuf;
use std::sync::Arc;

use super::*;
use crate::config::{keys, Settings};
use crate::protocol::{now_ms, Question, QuestionStatus};
use crate::store::{CachedStore, SqliteBackend, StoreConfig};
use crate::sync::FairMutex;

pub(crate) struct TestContext {
    _dir: tempfile::TempDir,
    pub db_path: PathBuf,
    pub store: Arc<CachedStore>,
    pub queue: Arc<QuestionQueue>,
}

pub(crate) fn setup() -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("queue.db");
    let backend = Arc::new(SqliteBackend::open(&db_path).unwrap());
    let store = CachedStore::new(backend, StoreConfig::default());
    let queue = QuestionQueue::new(Arc::clone(&store), Arc::new(FairMutex::new()));
    TestContext {
        _dir: dir,
        db_path,
        store,
        queue,
    }
}

/// Persist settings with the given queue cap.
pub(crate) async fn set_max_queue_size(ctx: &TestContext, size: usize) {
    let settings = Settings {
        max_queue_size: size,
        ..Settings::default()
    };
    settings.save(&ctx.store).await.unwrap();
}

/// Replace the persisted queue wholesale (for doctored fixtures).
pub(crate) async fn persist_queue(ctx: &TestContext, queue: &Vec<Question>) {
    ctx.store.set(keys::QUESTION_QUEUE, queue).await.unwrap();
}
