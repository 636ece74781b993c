//! Data fetcher implementations
//!
//! Layering, innermost first:
//!
//! - [`asos_http::AsosHttpClient`] performs exactly one HTTP attempt per call
//! - [`retry::RetryController`] wraps a [`PageSource`] with bounded backoff
//! - [`pagination::StationPaginator`] walks page numbers for one station/window

use crate::fetcher::asos_parser::ApiEnvelope;
use crate::StationId;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod asos_config;
pub mod asos_http;
pub mod asos_parser;
pub mod pagination;
pub mod retry;
pub mod retry_formatter;

/// Fetcher errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// The request did not complete within the request timeout
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-200 status
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Connection-level failure other than a timeout
    #[error("connection error: {0}")]
    Connection(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetcherError {
    /// Whether the failure is worth another attempt.
    ///
    /// Only timeouts and bad statuses are transient; connection errors and
    /// malformed bodies are surfaced to the caller unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetcherError::Timeout | FetcherError::HttpStatus(_))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One page request for a station over a date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Station to query
    pub station: StationId,
    /// First day of the range (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive)
    pub end_date: NaiveDate,
    /// 1-based page number
    pub page_no: u32,
}

impl PageRequest {
    /// Create a request for the given page
    pub fn new(station: StationId, start_date: NaiveDate, end_date: NaiveDate, page_no: u32) -> Self {
        Self {
            station,
            start_date,
            end_date,
            page_no,
        }
    }

    /// Same station and range, different page
    pub fn with_page(&self, page_no: u32) -> Self {
        Self {
            page_no,
            ..self.clone()
        }
    }

    /// Start date in the API's `YYYYMMDD` form
    pub fn start_stamp(&self) -> String {
        self.start_date.format("%Y%m%d").to_string()
    }

    /// End date in the API's `YYYYMMDD` form
    pub fn end_stamp(&self) -> String {
        self.end_date.format("%Y%m%d").to_string()
    }
}

/// A source of API pages performing a single attempt per call.
///
/// The production implementation is [`asos_http::AsosHttpClient`]; tests
/// substitute scripted sources.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page. Must not retry internally.
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ApiEnvelope>;
}
