//! # ASOS Downloader Library
//!
//! Retrieves historical hourly weather observations from the Korea
//! Meteorological Administration ASOS service on the public data portal and
//! consolidates them into a single CSV file.
//!
//! ## Features
//!
//! - **Quarter Chunking**: The configured year range is split into 3-month
//!   windows; each window is fetched for every station and persisted before
//!   the next one starts, so memory stays bounded to one quarter of records
//! - **Retry with Backoff**: Timeouts and non-200 responses are retried with an
//!   injectable exponential backoff policy
//! - **Resume Manifest**: Completed windows are recorded so an interrupted run
//!   skips them on restart
//! - **Pass-through Records**: Observation fields are written exactly as the API
//!   returns them
//!
//! ## Quick Start
//!
//! ```no_run
//! use asos_downloader::downloader::{DownloadExecutor, RunConfig};
//! use asos_downloader::StationId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stations = vec![StationId::parse("108")?, StationId::parse("112")?];
//! let config = RunConfig::new("MY-SERVICE-KEY", stations, 2021, 2024);
//! config.validate()?;
//!
//! let executor = DownloadExecutor::from_config(config.clone())?;
//! let summary = executor.run().await?;
//! println!("{} records written", summary.records_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Single-attempt HTTP client, response parsing, retry and pagination
//! - [`downloader`] - Run configuration, quarter windows and the chunk orchestrator
//! - [`output`] - Chunk file writer, path naming and final aggregation
//! - [`resume`] - Completed-window manifest and run lock
//! - [`shutdown`] - Ctrl+C coordination
//! - [`cli`] - Command line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Download orchestration
pub mod downloader;

/// Data fetchers
pub mod fetcher;

/// Data output writers
pub mod output;

/// Resume capability for interrupted runs
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// One observation row exactly as returned by the API.
///
/// Field order is preserved so chunk headers follow the API's column order.
pub type ObservationRecord = serde_json::Map<String, serde_json::Value>;

/// ASOS observation station identifier (e.g. `108` for Seoul)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier, which must be a non-empty run of ASCII digits
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("station id must not be empty".to_string());
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("station id must be numeric, got '{trimmed}'"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Station identifier as sent in the `stnIds` query parameter
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for StationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
