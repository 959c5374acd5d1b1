//! Typed posting errors.
//!
//! Classification happens once, from HTTP status codes and transport
//! failures; everything downstream branches on the variant, never on
//! message text.

use std::time::Duration;

/// Failure modes of a post attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PostError {
    /// Expired or invalid credential. Not retryable; the user must
    /// re-configure.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The credential is valid but lacks permission. Not retryable.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The server asked us to back off. Retryable after the given delay.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The request itself is unacceptable (e.g. the target no longer
    /// exists). Not retryable.
    #[error("request rejected: {0}")]
    BadRequest(String),

    /// Transport failure or server error. Retryable with backoff.
    #[error("network error: {0}")]
    Network(String),
}

impl PostError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PostError::RateLimited { .. } | PostError::Network(_)
        )
    }

    /// Delay before the next attempt. Rate limits honor the
    /// server-specified delay; other retryable errors back off
    /// exponentially as 2^(attempt-1) seconds.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let backoff_secs = 1u64 << attempt.saturating_sub(1).min(10);
        match self {
            PostError::RateLimited { retry_after_secs } => {
                Duration::from_secs((*retry_after_secs).max(backoff_secs))
            }
            _ => Duration::from_secs(backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(PostError::Network("timeout".into()).is_retryable());
        assert!(PostError::RateLimited { retry_after_secs: 30 }.is_retryable());
        assert!(!PostError::Auth("expired".into()).is_retryable());
        assert!(!PostError::Permission("forbidden".into()).is_retryable());
        assert!(!PostError::BadRequest("gone".into()).is_retryable());
    }

    #[test]
    fn test_exponential_backoff() {
        let e = PostError::Network("reset".into());
        assert_eq!(e.retry_delay(1), Duration::from_secs(1));
        assert_eq!(e.retry_delay(2), Duration::from_secs(2));
        assert_eq!(e.retry_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn test_rate_limit_delay_honors_server() {
        let e = PostError::RateLimited { retry_after_secs: 30 };
        assert_eq!(e.retry_delay(1), Duration::from_secs(30));
        // The exponential floor wins once it exceeds the server delay.
        assert_eq!(e.retry_delay(6), Duration::from_secs(32));
    }
}
