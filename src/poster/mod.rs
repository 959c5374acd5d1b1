//! Posting client.
//!
//! Wraps the external messaging API with credential acquisition, minimum
//! inter-request spacing, typed error classification, and
//! exponential-backoff retries.

mod error;
mod http;

use async_trait::async_trait;

pub use error::PostError;
pub use http::{classify_status, HttpPoster};

/// Supplies an opaque bearer token for the posting endpoint.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, PostError>;
}

/// Fixed token handed in at startup.
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<String, PostError> {
        self.token
            .clone()
            .ok_or_else(|| PostError::Auth("no posting credential configured".to_string()))
    }
}

/// A single post of `text` to `target_id`. Implementations retry
/// internally; an `Err` is final for this call.
#[async_trait]
pub trait PostClient: Send + Sync {
    async fn post(&self, target_id: &str, text: &str) -> Result<(), PostError>;
}
