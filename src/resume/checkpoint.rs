//! Per-window completion records

use crate::downloader::window::QuarterWindow;
use serde::{Deserialize, Serialize};

/// A quarter window whose chunk file holds complete data for every station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCheckpoint {
    window_id: String,
    record_count: u64,
    station_count: u32,
    completed_at: i64,
}

impl WindowCheckpoint {
    /// Record `window` as complete now
    pub fn completed(window: &QuarterWindow, record_count: u64, station_count: u32) -> Self {
        Self {
            window_id: window.id(),
            record_count,
            station_count,
            completed_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Window identifier (`YYYYMMDD_YYYYMMDD`)
    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    /// Rows written for the window
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Stations fetched for the window
    pub fn station_count(&self) -> u32 {
        self.station_count
    }

    /// Completion timestamp in Unix milliseconds
    pub fn completed_at(&self) -> i64 {
        self.completed_at
    }
}
