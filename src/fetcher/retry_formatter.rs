//! Retry message formatting
//!
//! Builds the per-attempt and final-failure log lines emitted by the retry
//! controller so every failure names the station, window and page involved.

use crate::fetcher::{FetcherError, PageRequest};
use std::time::Duration;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request exceeded the timeout
    NetworkTimeout,
    /// Non-200 status
    BadStatus(u16),
    /// Connection refused, DNS failure or other transport error
    ConnectionFailed,
    /// Body was not decodable JSON
    MalformedResponse,
}

impl RetryErrorType {
    /// Classify a fetcher error
    pub fn from_error(error: &FetcherError) -> Self {
        match error {
            FetcherError::Timeout => Self::NetworkTimeout,
            FetcherError::HttpStatus(code) => Self::BadStatus(*code),
            FetcherError::Connection(_) => Self::ConnectionFailed,
            FetcherError::Parse(_) => Self::MalformedResponse,
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "request timeout",
            Self::BadStatus(code) => match code {
                429 => "rate limit exceeded",
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "unexpected status code",
            },
            Self::ConnectionFailed => "connection failed",
            Self::MalformedResponse => "malformed response",
        }
    }

    /// Suggested remediation presented after failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "The service is slow for large ranges; try again later",
            Self::BadStatus(code) if *code >= 500 => {
                "The data portal may be under maintenance, try again later"
            }
            Self::BadStatus(_) => "Check that the service key is approved for this API",
            Self::ConnectionFailed => "Verify internet connectivity and DNS resolution",
            Self::MalformedResponse => {
                "Check the service key; key errors are returned as XML instead of JSON"
            }
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// Station being fetched
    pub station: String,
    /// Window as (start, end) in `YYYYMMDD`
    pub window: (String, String),
    /// Page number being fetched
    pub page: u32,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for a failed attempt
    pub fn new(
        request: &PageRequest,
        attempt: u32,
        max_attempts: u32,
        error: &FetcherError,
        backoff_duration: Duration,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from_error(error),
            backoff_duration,
            station: request.station.to_string(),
            window: (request.start_stamp(), request.end_stamp()),
            page: request.page_no,
            error_message: error.to_string(),
        }
    }

    /// `[108, 20210101, p3]` style prefix
    fn location(&self) -> String {
        format!("[{}, {}, p{}]", self.station, self.window.0, self.page)
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        format!(
            "{} {} - retrying ({}/{}) in {:.1} seconds",
            self.location(),
            self.error_type.description(),
            self.attempt,
            self.max_attempts,
            self.backoff_duration.as_secs_f64()
        )
    }

    /// Format retry success message when a previous attempt eventually works.
    pub fn format_success(&self) -> String {
        format!(
            "{} succeeded on attempt {}/{}",
            self.location(),
            self.attempt,
            self.max_attempts
        )
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let lines = [
            format!("[FAILED] Page request failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Station: {}", self.station),
            format!("  Window: {} to {}", self.window.0, self.window.1),
            format!("  Page: {}", self.page),
            format!("  Suggestion: {}", self.error_type.suggestion()),
        ];
        lines.join("\n")
    }
}
