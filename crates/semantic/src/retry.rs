//! Retry logic with exponential backoff for transient failures.
//!
//! Remote inference and translation calls go through [`execute_with_retry`],
//! which stops early on errors that retrying cannot fix (bad request,
//! authentication, not found).

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries (exponentially increased).
    #[serde(with = "millis", default = "RetryConfig::default_base_delay")]
    pub base_delay: Duration,
    /// Maximum delay between retries.
    #[serde(with = "millis", default = "RetryConfig::default_max_delay")]
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    #[serde(default = "RetryConfig::default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            base_delay: Self::default_base_delay(),
            max_delay: Self::default_max_delay(),
            jitter: Self::default_jitter(),
        }
    }
}

impl RetryConfig {
    fn default_max_retries() -> u32 {
        2
    }

    fn default_base_delay() -> Duration {
        Duration::from_millis(100)
    }

    fn default_max_delay() -> Duration {
        Duration::from_secs(2)
    }

    fn default_jitter() -> bool {
        true
    }

    /// No retries at all: a single attempt.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Durations travel as whole milliseconds in config files.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Result of a retry operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    /// The final result (Ok if succeeded, Err with the last error otherwise).
    pub result: Result<T, String>,
    /// Number of attempts made (1 = no retries needed).
    pub attempts: u32,
    /// Total duration spent on all attempts.
    pub total_duration: Duration,
}

impl<T> RetryResult<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Check if an error is retryable (transient).
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("temporarily")
        || error_lower.contains("unavailable")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("429")
        || error_lower.contains("504")
        || error_lower.contains("408")
    {
        return true;
    }

    if error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("400")
        || error_lower.contains("422")
        || error_lower.contains("invalid")
        || error_lower.contains("not found")
    {
        return false;
    }

    true
}

/// Execute an operation, retrying transient failures with backoff.
pub fn execute_with_retry<T, F>(config: &RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut(u32) -> Result<T, String>,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt) {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
            Err(error) => {
                if attempt >= config.max_retries || !is_retryable_error(&error) {
                    return RetryResult {
                        result: Err(error),
                        attempts: attempt + 1,
                        total_duration: start.elapsed(),
                    };
                }
                tracing::debug!(attempt, %error, "retrying after transient failure");
                std::thread::sleep(calculate_delay(config, attempt));
                attempt += 1;
            }
        }
    }
}

/// Calculate delay for a retry attempt with exponential backoff.
fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    let delay = exponential.min(config.max_delay.as_millis() as u64);

    if config.jitter {
        // Add 0-50% random jitter
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay + jitter)
    } else {
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2))
            .with_jitter(false)
    }

    #[test]
    fn retry_succeeds_eventually() {
        let config = fast().with_max_retries(3);
        let mut counter = 0;

        let result = execute_with_retry(&config, |_attempt| {
            counter += 1;
            if counter < 3 {
                Err("connection reset".to_string())
            } else {
                Ok("success")
            }
        });

        assert!(result.succeeded());
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap(), "success");
    }

    #[test]
    fn retry_fails_after_max_attempts() {
        let config = fast().with_max_retries(2);

        let result: RetryResult<String> =
            execute_with_retry(&config, |_attempt| Err("HTTP 503".to_string()));

        assert!(!result.succeeded());
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn permanent_errors_stop_immediately() {
        let config = fast().with_max_retries(5);

        let result: RetryResult<()> =
            execute_with_retry(&config, |_attempt| Err("HTTP 400 bad request".to_string()));

        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result().unwrap_err(), "HTTP 400 bad request");
    }

    #[test]
    fn disabled_makes_single_attempt() {
        let result: RetryResult<()> =
            execute_with_retry(&RetryConfig::disabled(), |_| Err("timeout".to_string()));
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn delay_is_capped() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250))
            .with_jitter(false);
        assert_eq!(calculate_delay(&config, 0), Duration::from_millis(100));
        assert_eq!(calculate_delay(&config, 1), Duration::from_millis(200));
        assert_eq!(calculate_delay(&config, 5), Duration::from_millis(250));
    }

    #[test]
    fn is_retryable_error_detection() {
        assert!(is_retryable_error("operation timed out"));
        assert!(is_retryable_error("HTTP 429"));
        assert!(!is_retryable_error("HTTP 401"));
        assert!(!is_retryable_error("invalid model key"));
    }

    #[test]
    fn config_deserializes_millis() {
        let cfg: RetryConfig =
            serde_json::from_str(r#"{"max_retries": 4, "base_delay": 50, "max_delay": 500}"#)
                .unwrap();
        assert_eq!(cfg.max_retries, 4);
        assert_eq!(cfg.base_delay, Duration::from_millis(50));
        assert_eq!(cfg.max_delay, Duration::from_millis(500));
        assert!(cfg.jitter);
    }
}
