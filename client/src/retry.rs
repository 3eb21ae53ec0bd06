//! HTTP retry policy with exponential backoff.
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 500ms, doubling, capped at 8s
//! - Down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - Retryable: HTTP 408, 409, 429, 5xx and connection errors
//! - `x-should-retry: true|false` from the server overrides the status rule
//!
//! Every attempt of one logical request carries the same `Idempotency-Key`.
//! Only reads (search, count, lookup) are retried; workflow commands go out
//! with [`RetryConfig::single_attempt`].

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};
use uuid::Uuid;

use rxtriage_core::config::DEFAULT_MAX_RETRIES;

const RETRY_COUNT_HEADER: &str = "X-Retry-Count";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay that jitter may remove (0.25 = up to 25%).
    pub jitter_factor: f64,
}

impl RetryConfig {
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Same timing, no retries.
    #[must_use]
    pub fn single_attempt(&self) -> Self {
        Self {
            max_retries: 0,
            ..self.clone()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// `Retry-After-Ms` (float milliseconds) or `Retry-After` (whole seconds),
/// accepted only when strictly between zero and one minute.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    let from_ms = header("retry-after-ms")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| Duration::from_secs_f64(ms / 1000.0));
    let from_secs = || {
        header("retry-after")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    };

    from_ms
        .filter(|delay| *delay < MAX_RETRY_AFTER)
        .or_else(|| from_secs().filter(|delay| !delay.is_zero() && *delay < MAX_RETRY_AFTER))
}

#[must_use]
pub fn should_retry(status: StatusCode, headers: &HeaderMap) -> bool {
    match headers
        .get("x-should-retry")
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value.eq_ignore_ascii_case("true") => return true,
        Some(value) if value.eq_ignore_ascii_case("false") => return false,
        _ => {}
    }
    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

/// Delay before retry number `backoff_step + 1`.
#[must_use]
pub fn retry_delay(backoff_step: u32, config: &RetryConfig, headers: Option<&HeaderMap>) -> Duration {
    if let Some(delay) = headers.and_then(parse_retry_after) {
        return delay;
    }
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

#[must_use]
pub fn idempotency_key() -> String {
    format!("rxtriage-{}", Uuid::new_v4())
}

/// How a retried request ended.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response after retries were exhausted or ruled out; the body
    /// is still unread.
    HttpError(Response),
    /// Transport failure on the final attempt.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure that retrying cannot fix (bad URL, builder error).
    NonRetryable(reqwest::Error),
}

impl RetryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Send the request built by `build_request`, retrying per `config`.
///
/// `build_request` is called once per attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let key = idempotency_key();
    let mut attempt = 0_u32;

    loop {
        let last_attempt = attempt >= config.max_retries;
        let request = build_request()
            .header(RETRY_COUNT_HEADER, attempt.to_string())
            .header(IDEMPOTENCY_HEADER, key.as_str());

        let delay = match request.send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                if last_attempt || !should_retry(response.status(), response.headers()) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = retry_delay(attempt, config, Some(response.headers()));
                tracing::debug!(
                    status = %response.status(),
                    retry = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "retrying after error status"
                );
                delay
            }
            Err(err) if !is_retryable_error(&err) => {
                return if attempt == 0 {
                    RetryOutcome::NonRetryable(err)
                } else {
                    RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source: err,
                    }
                };
            }
            Err(err) => {
                if last_attempt {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source: err,
                    };
                }
                let delay = retry_delay(attempt, config, None);
                tracing::debug!(
                    error = %err,
                    retry = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "retrying after connection error"
                );
                delay
            }
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_prefers_milliseconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after-ms", HeaderValue::from_static("1500"));
        headers.insert("retry-after", HeaderValue::from_static("5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn retry_after_seconds_out_of_range_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("0"));
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("2"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));
    }

    #[test]
    fn retryable_statuses() {
        let headers = HeaderMap::new();
        for status in [408, 409, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(should_retry(status, &headers), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 422] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(!should_retry(status, &headers), "{status} should not retry");
        }
    }

    #[test]
    fn server_header_overrides_status_rule() {
        let mut headers = HeaderMap::new();
        headers.insert("x-should-retry", HeaderValue::from_static("true"));
        assert!(should_retry(StatusCode::BAD_REQUEST, &headers));
        headers.insert("x-should-retry", HeaderValue::from_static("FALSE"));
        assert!(!should_retry(StatusCode::SERVICE_UNAVAILABLE, &headers));
    }

    #[test]
    fn backoff_doubles_within_jitter_band() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let first = retry_delay(0, &config, None);
            assert!(first >= Duration::from_millis(375) && first <= Duration::from_millis(500));
            let second = retry_delay(1, &config, None);
            assert!(second >= Duration::from_millis(750) && second <= Duration::from_millis(1000));
        }
        let capped = retry_delay(10, &config, None);
        assert!(capped <= Duration::from_secs(8));
    }

    #[test]
    fn idempotency_keys_are_unique() {
        let first = idempotency_key();
        assert!(first.starts_with("rxtriage-"));
        assert_ne!(first, idempotency_key());
    }
}
