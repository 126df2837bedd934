use super::ApiError;
use reqwest::Method;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(300);

/// Bounded retry with exponential backoff for transient failures.
///
/// Network failures are retried for every method. Server errors are only
/// retried for idempotent methods so a POST that reached the server is not
/// submitted twice. Client errors are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Whether a request that failed on `attempt` (1-based) goes again.
    pub fn should_retry(&self, method: &Method, error: &ApiError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match error {
            ApiError::Network(_) => true,
            ApiError::Server { .. } => is_idempotent(method),
            _ => false,
        }
    }

    /// Wait before the attempt following `attempt`: base, 2×base, 4×base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

fn is_idempotent(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]
    .contains(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> ApiError {
        ApiError::Server {
            status: 502,
            message: "bad gateway".into(),
        }
    }

    #[test]
    fn test_network_errors_retry_until_limit() {
        let policy = RetryPolicy::default();
        let err = ApiError::Network("refused".into());
        assert!(policy.should_retry(&Method::POST, &err, 1));
        assert!(policy.should_retry(&Method::POST, &err, 2));
        assert!(!policy.should_retry(&Method::POST, &err, 3));
    }

    #[test]
    fn test_server_errors_only_retry_idempotent_methods() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&Method::GET, &server_error(), 1));
        assert!(policy.should_retry(&Method::PUT, &server_error(), 1));
        assert!(!policy.should_retry(&Method::POST, &server_error(), 1));
    }

    #[test]
    fn test_client_errors_never_retry() {
        let policy = RetryPolicy::default();
        let bad_request = ApiError::Validation {
            status: 400,
            message: "bad".into(),
        };
        assert!(!policy.should_retry(&Method::GET, &bad_request, 1));
        assert!(!policy.should_retry(&Method::GET, &ApiError::AuthExpired, 1));
        assert!(!policy.should_retry(&Method::GET, &ApiError::NotFound("x".into()), 1));
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.should_retry(&Method::GET, &ApiError::Network("x".into()), 1));
    }
}
