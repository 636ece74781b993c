//! Download orchestration and request pacing
//!
//! The downloader drives a run from configuration to chunk files:
//!
//! 1. **Configuration**: Everything a run needs lives in [`config::RunConfig`]
//! 2. **Windows**: The year range is split by [`window::quarter_windows`]
//! 3. **Execution**: [`executor::DownloadExecutor`] fetches every station per
//!    window and appends the records to the window's chunk file
//! 4. **Pacing**: All pauses and backoff delays go through [`rate_limit::Sleeper`]
//! 5. **Resume Support**: Completed windows are recorded in the manifest
//!
//! # Quick Start
//!
//! ```no_run
//! use asos_downloader::downloader::{aggregate_chunks, DownloadExecutor, RunConfig};
//! use asos_downloader::StationId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new("MY-SERVICE-KEY", vec![StationId::parse("108")?], 2023, 2023)
//!     .with_data_dir("./data");
//!
//! let executor = DownloadExecutor::from_config(config.clone())?;
//! let summary = executor.run().await?;
//! if !summary.interrupted {
//!     let report = aggregate_chunks(&config.paths(), config.remove_chunks)?;
//!     println!("{} rows in {}", report.rows, report.output.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Failures are contained at the smallest unit. A station that exhausts its
//! retries or hits a fatal error only ends that station's pagination; a chunk
//! write failure only affects its window. [`DownloadError`] is returned for
//! problems that stop the whole run: invalid configuration, an unusable
//! manifest, or a data directory that cannot be created or locked.

pub mod config;
pub mod executor;
pub mod job;
pub mod rate_limit;
pub mod window;

pub use config::{BackoffPolicy, ConfigError, ResumeMode, RunConfig};
pub use executor::{aggregate_chunks, DownloadExecutor};
pub use job::{RunSummary, StationReport, WindowReport, WindowStatus};
pub use rate_limit::{RecordingSleeper, Sleeper, TokioSleeper};
pub use window::{quarter_windows, QuarterWindow};

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::resume::ResumeError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Manifest or run lock problem
    #[error("resume error: {0}")]
    Resume(#[from] ResumeError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// HTTP client could not be built
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),
}
