//! User-facing notifications.
//!
//! Failures the user must act on (expired credentials, revoked
//! permissions) are `persistent`; ordinary retry chatter is transient.
//! Every emit is broadcast to live subscribers, kept in a bounded recent
//! ring for the status endpoint, and logged at the matching level.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::protocol::now_ms;

const RECENT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub severity: Severity,
    /// Requires user action; surfaced until acknowledged rather than as a
    /// transient line.
    pub persistent: bool,
    pub message: String,
    pub timestamp: u64,
}

pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    recent: Mutex<VecDeque<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            recent: Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY)),
        }
    }

    pub fn emit(&self, severity: Severity, persistent: bool, message: impl Into<String>) {
        let notification = Notification {
            severity,
            persistent,
            message: message.into(),
            timestamp: now_ms(),
        };

        match severity {
            Severity::Info => info!(message = %notification.message, "notification"),
            Severity::Warning => warn!(message = %notification.message, "notification"),
            Severity::Error => error!(
                message = %notification.message,
                persistent = persistent,
                "notification"
            ),
        }

        {
            let mut recent = self.recent.lock();
            if recent.len() >= RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(notification.clone());
        }

        // Only pay for the broadcast when someone is listening.
        if self.tx.receiver_count() > 0 {
            let _ = self.tx.send(notification);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, false, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, false, message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Recent notifications, newest last.
    pub fn recent(&self) -> Vec<Notification> {
        self.recent.lock().iter().cloned().collect()
    }

    /// Drop transient entries older than `older_than_ms`; persistent
    /// ones stay until acknowledged. Called by the upkeep loop.
    pub fn trim_transient(&self, older_than_ms: u64) -> usize {
        let cutoff = now_ms().saturating_sub(older_than_ms);
        let mut recent = self.recent.lock();
        let before = recent.len();
        recent.retain(|n| n.persistent || n.timestamp >= cutoff);
        before - recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers_and_ring() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.emit(Severity::Error, true, "credentials expired");

        let received = rx.recv().await.unwrap();
        assert_eq!(received.severity, Severity::Error);
        assert!(received.persistent);

        let recent = notifier.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "credentials expired");
    }

    #[tokio::test]
    async fn test_ring_is_bounded() {
        let notifier = Notifier::new();
        for i in 0..(RECENT_CAPACITY + 10) {
            notifier.info(format!("event {}", i));
        }
        assert_eq!(notifier.recent().len(), RECENT_CAPACITY);
    }

    #[tokio::test]
    async fn test_trim_drops_only_stale_transient() {
        let notifier = Notifier::new();
        notifier.info("fresh transient");
        notifier.emit(Severity::Error, true, "needs action");

        // Nothing is old enough yet.
        assert_eq!(notifier.trim_transient(60_000), 0);

        // With a zero age window every transient entry is stale.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let dropped = notifier.trim_transient(0);
        assert_eq!(dropped, 1);
        let recent = notifier.recent();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].persistent);
    }
}
