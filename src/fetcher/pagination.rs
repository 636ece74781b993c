//! Page-number pagination for one station and window
//!
//! Requests pages 1, 2, ... through the [`RetryController`] and accumulates
//! their items in page order until one of:
//! - the accumulated count reaches the server-reported `totalCount`
//! - a page comes back with no items, or the header reports `NO_DATA`
//! - the body is missing, malformed, or retries are exhausted
//!
//! Failures never propagate as errors: the records gathered so far are always
//! returned together with a [`PageOutcome`] describing why the loop stopped.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::downloader::config::PAGE_PAUSE;
use crate::downloader::rate_limit::Sleeper;
use crate::fetcher::retry::{RetryController, RetryError};
use crate::fetcher::{FetcherError, PageRequest};
use crate::{ObservationRecord, StationId};
use chrono::NaiveDate;
use serde::Serialize;

/// Maximum number of pages per station/window to prevent infinite loops
const MAX_PAGES: u32 = 10_000;

/// Why pagination for a station stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Accumulated count reached `totalCount`
    TotalReached,
    /// A page contained no items
    EndOfData,
    /// Retries exhausted on some page
    RetryExhausted,
    /// Response without a body; carries `resultMsg`
    ApiFailure(String),
    /// Body could not be decoded
    Malformed(String),
    /// Connection-level failure
    Fatal(String),
    /// Page safety limit hit
    PageLimit,
}

impl PageOutcome {
    /// Whether the station's data for the window is complete
    pub fn is_clean(&self) -> bool {
        matches!(self, PageOutcome::TotalReached | PageOutcome::EndOfData)
    }
}

/// Records collected for one station and window
#[derive(Debug, Clone)]
pub struct StationFetch {
    /// Station fetched
    pub station: StationId,
    /// Records in page order
    pub records: Vec<ObservationRecord>,
    /// Pages that returned a body
    pub pages: u32,
    /// Last server-reported total, if any page answered
    pub total_count: Option<u64>,
    /// Termination reason
    pub outcome: PageOutcome,
}

/// Paginator over the retry controller
pub struct StationPaginator {
    retry: RetryController,
    sleeper: Arc<dyn Sleeper>,
    page_pause: Duration,
}

impl StationPaginator {
    /// Create a paginator with the default page pause
    pub fn new(retry: RetryController, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            retry,
            sleeper,
            page_pause: PAGE_PAUSE,
        }
    }

    /// Override the pause between successful pages
    pub fn with_page_pause(mut self, page_pause: Duration) -> Self {
        self.page_pause = page_pause;
        self
    }

    /// Fetch every page for `station` between `start` and `end` (inclusive)
    pub async fn fetch_station(
        &self,
        station: &StationId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StationFetch {
        let base = PageRequest::new(station.clone(), start, end, 1);
        let mut records: Vec<ObservationRecord> = Vec::new();
        let mut pages = 0u32;
        let mut total_count = None;
        let mut page_no = 1u32;

        let outcome = loop {
            if page_no > MAX_PAGES {
                warn!(
                    station = %station,
                    max_pages = MAX_PAGES,
                    "Page limit exceeded - possible inconsistent totalCount"
                );
                break PageOutcome::PageLimit;
            }

            let request = base.with_page(page_no);
            let envelope = match self.retry.fetch(&request).await {
                Ok(envelope) => envelope,
                Err(RetryError::Exhausted { attempts, .. }) => {
                    warn!(
                        station = %station,
                        page = page_no,
                        attempts,
                        collected = records.len(),
                        "Retries exhausted, keeping records collected so far"
                    );
                    break PageOutcome::RetryExhausted;
                }
                Err(RetryError::Aborted(FetcherError::Parse(msg))) => {
                    warn!(station = %station, page = page_no, "[FAIL] JSON decode error: {}", msg);
                    break PageOutcome::Malformed(msg);
                }
                Err(RetryError::Aborted(error)) => {
                    warn!(station = %station, page = page_no, "[FATAL ERROR] connection error: {}", error);
                    break PageOutcome::Fatal(error.to_string());
                }
            };

            let body = match envelope.body {
                Some(body) => body,
                None if envelope.is_no_data() => {
                    debug!(station = %station, page = page_no, "Service reported NO_DATA");
                    break PageOutcome::EndOfData;
                }
                None => {
                    let msg = envelope.failure_message().to_string();
                    warn!(station = %station, page = page_no, "[FAIL] no data or API error: {}", msg);
                    break PageOutcome::ApiFailure(msg);
                }
            };

            pages += 1;
            total_count = Some(body.total_count);

            if body.items.is_empty() {
                debug!(
                    station = %station,
                    page = page_no,
                    collected = records.len(),
                    "Empty page received"
                );
                break PageOutcome::EndOfData;
            }

            debug!(
                station = %station,
                page = page_no,
                items = body.items.len(),
                total_count = body.total_count,
                "Received page"
            );

            records.extend(body.items);

            if records.len() as u64 >= body.total_count {
                break PageOutcome::TotalReached;
            }

            page_no += 1;
            self.sleeper.sleep(self.page_pause).await;
        };

        info!(
            station = %station,
            start = %start,
            end = %end,
            records = records.len(),
            pages,
            outcome = ?outcome,
            "Station pagination finished"
        );

        StationFetch {
            station: station.clone(),
            records,
            pages,
            total_count,
            outcome,
        }
    }
}
