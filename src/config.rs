//! Configuration.
//!
//! Process-level knobs come from the environment once at startup
//! (`RuntimeConfig::from_env`). Operational settings live in the
//! persisted store under stable keys and are loaded into one `Settings`
//! struct per operation, so every consumer sees a consistent snapshot.

use std::path::PathBuf;

use crate::store::{CachedStore, StorageError};

/// Persisted store keys.
pub mod keys {
    pub const QUESTION_QUEUE: &str = "questionQueue";
    pub const IS_RUNNING: &str = "isRunning";
    pub const POST_INTERVAL_SEC: &str = "POST_INTERVAL_SEC";
    pub const MAX_RETRY_ATTEMPTS: &str = "MAX_RETRY_ATTEMPTS";
    pub const QUESTION_PREFIX: &str = "QUESTION_PREFIX";
    pub const NG_KEYWORDS: &str = "NG_KEYWORDS";
    pub const MAX_QUEUE_SIZE: &str = "MAX_QUEUE_SIZE";
}

/// Lower bound on the posting interval.
pub const MIN_POST_INTERVAL_SECS: u64 = 10;

/// Minimum spacing enforced between manual post triggers.
pub const MIN_TRIGGER_SPACING_SECS: u64 = 5;

const DEFAULT_POST_INTERVAL_SECS: u64 = 1800;
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Dedup window: identical normalized text received within this span of
/// an existing pending/next/sent entry is dropped.
pub const DEDUP_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Terminal entries older than this are eligible for eviction.
pub const RETENTION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Operational settings, persisted in the store.
#[derive(Debug, Clone)]
pub struct Settings {
    pub post_interval_secs: u64,
    pub max_retry_attempts: u32,
    pub question_prefix: String,
    pub ng_keywords: Vec<String>,
    pub max_queue_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            post_interval_secs: DEFAULT_POST_INTERVAL_SECS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            question_prefix: String::new(),
            ng_keywords: Vec::new(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl Settings {
    /// Load the settings snapshot in one batched store read; absent keys
    /// fall back to defaults.
    pub async fn load(store: &CachedStore) -> Result<Self, StorageError> {
        let found = store
            .get_many_raw(&[
                keys::POST_INTERVAL_SEC,
                keys::MAX_RETRY_ATTEMPTS,
                keys::QUESTION_PREFIX,
                keys::NG_KEYWORDS,
                keys::MAX_QUEUE_SIZE,
            ])
            .await?;

        let mut settings = Settings::default();
        if let Some(bytes) = found.get(keys::POST_INTERVAL_SEC) {
            settings.post_interval_secs = decode(bytes)?;
        }
        if let Some(bytes) = found.get(keys::MAX_RETRY_ATTEMPTS) {
            settings.max_retry_attempts = decode(bytes)?;
        }
        if let Some(bytes) = found.get(keys::QUESTION_PREFIX) {
            settings.question_prefix = decode(bytes)?;
        }
        if let Some(bytes) = found.get(keys::NG_KEYWORDS) {
            settings.ng_keywords = decode(bytes)?;
        }
        if let Some(bytes) = found.get(keys::MAX_QUEUE_SIZE) {
            settings.max_queue_size = decode(bytes)?;
        }
        Ok(settings)
    }

    /// Persist all settings in one batched store write.
    pub async fn save(&self, store: &CachedStore) -> Result<(), StorageError> {
        store
            .set_many_raw(vec![
                (keys::POST_INTERVAL_SEC.to_string(), encode(&self.post_interval_secs)?),
                (keys::MAX_RETRY_ATTEMPTS.to_string(), encode(&self.max_retry_attempts)?),
                (keys::QUESTION_PREFIX.to_string(), encode(&self.question_prefix)?),
                (keys::NG_KEYWORDS.to_string(), encode(&self.ng_keywords)?),
                (keys::MAX_QUEUE_SIZE.to_string(), encode(&self.max_queue_size)?),
            ])
            .await
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(value).map_err(|e| StorageError::Encode(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}

/// Process-level configuration read from the environment at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_port: u16,
    pub data_path: PathBuf,
    pub auth_tokens: Vec<String>,
    /// External posting endpoint.
    pub post_endpoint: String,
    /// Target identifier passed to the posting endpoint.
    pub post_target: String,
    /// Opaque bearer token for the posting endpoint.
    pub post_token: Option<String>,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let http_port = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(6810);

        let data_path = std::env::var("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("postq.db"));

        let auth_tokens: Vec<String> = std::env::var("AUTH_TOKENS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        let post_endpoint = std::env::var("POST_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9800/notes/create".to_string());

        let post_target = std::env::var("POST_TARGET").unwrap_or_else(|_| "default".to_string());

        let post_token = std::env::var("POST_TOKEN").ok().filter(|t| !t.is_empty());

        Self {
            http_port,
            data_path,
            auth_tokens,
            post_endpoint,
            post_target,
            post_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.post_interval_secs >= MIN_POST_INTERVAL_SECS);
        assert!(settings.max_retry_attempts > 0);
        assert!(settings.ng_keywords.is_empty());
    }
}
