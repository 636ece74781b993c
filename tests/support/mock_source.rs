//! In-memory page source serving synthetic observations

use asos_downloader::fetcher::asos_config::PAGE_SIZE;
use asos_downloader::fetcher::asos_parser::{ApiEnvelope, PageBody};
use asos_downloader::fetcher::{FetcherError, FetcherResult, PageRequest, PageSource};
use asos_downloader::shutdown::SharedShutdown;
use asos_downloader::ObservationRecord;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Serves `records_per_window` rows for every station and window, paged by 50
pub struct MockAsos {
    records_per_window: usize,
    overrides: HashMap<String, usize>,
    failing: HashSet<String>,
    shutdown_after: Option<(usize, SharedShutdown)>,
    calls: Mutex<Vec<PageRequest>>,
}

impl MockAsos {
    pub fn new(records_per_window: usize) -> Self {
        Self {
            records_per_window,
            overrides: HashMap::new(),
            failing: HashSet::new(),
            shutdown_after: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve `count` rows for `station` instead of the default
    pub fn with_station_count(mut self, station: &str, count: usize) -> Self {
        self.overrides.insert(station.to_string(), count);
        self
    }

    /// Answer every request for `station` with HTTP 500
    pub fn with_failing_station(mut self, station: &str) -> Self {
        self.failing.insert(station.to_string());
        self
    }

    /// Trip `shutdown` once `calls` requests have been served
    pub fn with_shutdown_after(mut self, calls: usize, shutdown: SharedShutdown) -> Self {
        self.shutdown_after = Some((calls, shutdown));
        self
    }

    pub fn calls(&self) -> Vec<PageRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Synthetic hourly observation
pub fn observation(station: &str, start: &str, n: usize) -> ObservationRecord {
    let mut record = ObservationRecord::new();
    record.insert("tm".into(), json!(format!("{start} #{n:05}")));
    record.insert("stnId".into(), json!(station));
    record.insert("ta".into(), json!(format!("{:.1}", n as f64 / 10.0)));
    record
}

#[async_trait]
impl PageSource for MockAsos {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ApiEnvelope> {
        let served = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        if let Some((after, shutdown)) = &self.shutdown_after {
            if served >= *after {
                shutdown.request_shutdown();
            }
        }

        let station = request.station.as_str();
        if self.failing.contains(station) {
            return Err(FetcherError::HttpStatus(500));
        }

        let total = self
            .overrides
            .get(station)
            .copied()
            .unwrap_or(self.records_per_window);
        let page_size = PAGE_SIZE as usize;
        let from = (request.page_no as usize - 1) * page_size;
        let to = (from + page_size).min(total);
        let start = request.start_stamp();
        let items = (from..to.max(from))
            .map(|n| observation(station, &start, n))
            .collect();

        Ok(ApiEnvelope::with_body(PageBody::new(items, total as u64)))
    }
}
