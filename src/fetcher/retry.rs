//! Bounded retry with exponential backoff
//!
//! Wraps one [`PageSource`] call:
//! - timeouts and non-200 statuses are retried after a backoff delay
//! - connection errors and malformed bodies abort immediately
//! - no delay follows the final attempt

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::downloader::config::{BackoffPolicy, MAX_ATTEMPTS};
use crate::downloader::rate_limit::Sleeper;
use crate::fetcher::asos_parser::ApiEnvelope;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::{FetcherError, PageRequest, PageSource};

/// Why a page could not be fetched
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// Every attempt failed with a transient error
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: FetcherError,
    },

    /// A non-transient error ended the retries early
    #[error("request aborted: {0}")]
    Aborted(FetcherError),
}

/// Retry controller around a page source
pub struct RetryController {
    source: Arc<dyn PageSource>,
    sleeper: Arc<dyn Sleeper>,
    policy: BackoffPolicy,
    max_attempts: u32,
}

impl RetryController {
    /// Create a controller with the default policy and attempt limit
    pub fn new(source: Arc<dyn PageSource>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            source,
            sleeper,
            policy: BackoffPolicy::default(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Replace the backoff policy
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the attempt limit (values below 1 are treated as 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Configured attempt limit
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch one page with retries
    ///
    /// # Errors
    /// - [`RetryError::Exhausted`] when all attempts failed transiently
    /// - [`RetryError::Aborted`] on the first non-transient failure
    pub async fn fetch(&self, request: &PageRequest) -> Result<ApiEnvelope, RetryError> {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match self.source.fetch_page(request).await {
                Ok(envelope) => {
                    if attempt > 0 {
                        let ctx = RetryContext::new(
                            request,
                            attempt + 1,
                            self.max_attempts,
                            last_error.as_ref().unwrap_or(&FetcherError::Timeout),
                            Duration::ZERO,
                        );
                        info!("{}", ctx.format_success());
                    }
                    return Ok(envelope);
                }
                Err(error) if error.is_transient() => {
                    let is_last = attempt + 1 >= self.max_attempts;
                    let backoff = if is_last {
                        Duration::ZERO
                    } else {
                        self.policy.delay_for(&error, attempt)
                    };
                    let ctx =
                        RetryContext::new(request, attempt + 1, self.max_attempts, &error, backoff);

                    if is_last {
                        warn!("{}", ctx.format_failure());
                    } else {
                        warn!("{}", ctx.format_retry());
                        self.sleeper.sleep(backoff).await;
                    }
                    last_error = Some(error);
                }
                Err(error) => {
                    warn!(
                        station = %request.station,
                        page = request.page_no,
                        error = %error,
                        "Non-retryable failure, aborting page request"
                    );
                    return Err(RetryError::Aborted(error));
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last_error: last_error.unwrap_or(FetcherError::Timeout),
        })
    }
}
