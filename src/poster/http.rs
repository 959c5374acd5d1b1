//! HTTP posting client over reqwest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{CredentialProvider, PostClient, PostError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MIN_SPACING: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Classify a non-success HTTP status into a typed error.
pub fn classify_status(status: StatusCode, retry_after_secs: Option<u64>) -> PostError {
    let reason = status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string();
    match status {
        StatusCode::UNAUTHORIZED => PostError::Auth(reason),
        StatusCode::FORBIDDEN => PostError::Permission(reason),
        StatusCode::TOO_MANY_REQUESTS => PostError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_client_error() => PostError::BadRequest(reason),
        _ => PostError::Network(reason),
    }
}

/// Posting client for the external messaging API.
pub struct HttpPoster {
    client: reqwest::Client,
    endpoint: url::Url,
    credentials: Arc<dyn CredentialProvider>,
    max_attempts: u32,
    min_spacing: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpPoster {
    pub fn new(
        endpoint: &str,
        credentials: Arc<dyn CredentialProvider>,
        max_attempts: u32,
    ) -> Result<Self, PostError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| PostError::BadRequest(format!("invalid endpoint: {}", e)))?;
        match endpoint.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(PostError::BadRequest(format!(
                    "invalid endpoint scheme '{}': only http/https allowed",
                    scheme
                )))
            }
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            endpoint,
            credentials,
            max_attempts: max_attempts.max(1),
            min_spacing: DEFAULT_MIN_SPACING,
            last_request: Mutex::new(None),
        })
    }

    /// Override the minimum inter-request spacing.
    pub fn with_min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }

    /// Sleep out the remainder of the spacing window, then claim it.
    async fn enforce_spacing(&self) {
        let wait = {
            let last = self.last_request.lock();
            last.map(|t| self.min_spacing.saturating_sub(t.elapsed()))
                .unwrap_or_default()
        };
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit spacing");
            tokio::time::sleep(wait).await;
        }
        *self.last_request.lock() = Some(Instant::now());
    }

    async fn send_once(&self, token: &str, target_id: &str, text: &str) -> Result<(), PostError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&serde_json::json!({
                "targetId": target_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        Err(classify_status(status, retry_after_secs))
    }
}

#[async_trait]
impl PostClient for HttpPoster {
    async fn post(&self, target_id: &str, text: &str) -> Result<(), PostError> {
        let mut attempt = 1u32;
        loop {
            self.enforce_spacing().await;
            let token = self.credentials.bearer_token().await?;

            match self.send_once(&token, target_id, text).await {
                Ok(()) => {
                    debug!(target = %target_id, attempt, "Post delivered");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = e.retry_delay(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Post attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None),
            PostError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, None),
            PostError::Permission(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, None),
            PostError::BadRequest(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None),
            PostError::BadRequest(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, None),
            PostError::Network(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None),
            PostError::Network(_)
        ));
    }

    #[test]
    fn test_rate_limit_uses_server_delay() {
        match classify_status(StatusCode::TOO_MANY_REQUESTS, Some(30)) {
            PostError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 30),
            other => panic!("unexpected classification: {:?}", other),
        }
        match classify_status(StatusCode::TOO_MANY_REQUESTS, None) {
            PostError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, DEFAULT_RETRY_AFTER_SECS)
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let creds = Arc::new(super::super::StaticCredentials::new(None));
        assert!(HttpPoster::new("ftp://example.com/post", creds, 3).is_err());
    }
}
