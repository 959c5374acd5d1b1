//! Synchronization primitives.

mod mutex;

pub use mutex::{FairMutex, FairMutexGuard};
