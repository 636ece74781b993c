//! Per-window and per-run reports

use crate::downloader::window::QuarterWindow;
use crate::fetcher::pagination::{PageOutcome, StationFetch};
use crate::StationId;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one quarter window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    /// Every station ended cleanly, records persisted and recorded
    Completed,
    /// Records persisted but at least one station ended with a failure
    Partial,
    /// No station returned records; nothing written
    Empty,
    /// Already recorded in the resume manifest
    Skipped,
    /// Appending to the chunk file failed
    PersistFailed,
    /// Abandoned because shutdown was requested
    Interrupted,
}

/// Summary of one station's fetch within a window
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    /// Station fetched
    pub station: StationId,
    /// Records received
    pub records: u64,
    /// Pages that returned a body
    pub pages: u32,
    /// Termination reason
    pub outcome: PageOutcome,
}

impl From<&StationFetch> for StationReport {
    fn from(fetch: &StationFetch) -> Self {
        Self {
            station: fetch.station.clone(),
            records: fetch.records.len() as u64,
            pages: fetch.pages,
            outcome: fetch.outcome.clone(),
        }
    }
}

/// Result of processing one window
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    /// Window id (`YYYYMMDD_YYYYMMDD`)
    pub window_id: String,
    /// Chunk file of the window
    pub chunk_path: PathBuf,
    /// Outcome
    pub status: WindowStatus,
    /// Rows appended to the chunk file
    pub records_written: u64,
    /// Per-station detail, empty for skipped windows
    pub stations: Vec<StationReport>,
    /// Persistence error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WindowReport {
    /// Report for a window skipped through the manifest
    pub fn skipped(window: &QuarterWindow, chunk_path: PathBuf) -> Self {
        Self {
            window_id: window.id(),
            chunk_path,
            status: WindowStatus::Skipped,
            records_written: 0,
            stations: Vec::new(),
            error: None,
        }
    }

    /// Whether every station of the window ended cleanly
    pub fn all_stations_clean(&self) -> bool {
        self.stations.iter().all(|s| s.outcome.is_clean())
    }
}

/// Result of a full download run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Window reports in processing order
    pub windows: Vec<WindowReport>,
    /// Rows appended across all chunk files
    pub records_written: u64,
    /// Windows completed in this run
    pub windows_completed: u32,
    /// Windows persisted with failed stations
    pub windows_partial: u32,
    /// Windows without any records
    pub windows_empty: u32,
    /// Windows skipped through the manifest
    pub windows_skipped: u32,
    /// Windows whose chunk file could not be written
    pub persist_failures: u32,
    /// Whether the run stopped early on shutdown
    pub interrupted: bool,
}

impl RunSummary {
    /// Add a window report and update counters
    pub fn record(&mut self, report: WindowReport) {
        match report.status {
            WindowStatus::Completed => self.windows_completed += 1,
            WindowStatus::Partial => self.windows_partial += 1,
            WindowStatus::Empty => self.windows_empty += 1,
            WindowStatus::Skipped => self.windows_skipped += 1,
            WindowStatus::PersistFailed => self.persist_failures += 1,
            WindowStatus::Interrupted => self.interrupted = true,
        }
        self.records_written += report.records_written;
        self.windows.push(report);
    }

    /// Stations that ended with a failure, as `(window id, station, outcome)`
    pub fn failed_stations(&self) -> Vec<(&str, &StationId, &PageOutcome)> {
        self.windows
            .iter()
            .flat_map(|w| {
                w.stations
                    .iter()
                    .filter(|s| !s.outcome.is_clean())
                    .map(move |s| (w.window_id.as_str(), &s.station, &s.outcome))
            })
            .collect()
    }
}
