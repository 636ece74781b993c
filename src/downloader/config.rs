//! Download configuration constants and the run configuration object

use crate::fetcher::asos_config::DEFAULT_BASE_URL;
use crate::fetcher::FetcherError;
use crate::output::path::ChunkPaths;
use crate::StationId;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Maximum number of attempts per page, including the first one.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay after a timeout; doubles with every attempt.
pub const TIMEOUT_BACKOFF_BASE: Duration = Duration::from_secs(3);

/// Base delay after a non-200 status; doubles with every attempt.
pub const STATUS_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Cap on any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Pause between successive pages of one station.
pub const PAGE_PAUSE: Duration = Duration::from_millis(500);

/// Pause before each station fetch, except the first of a run.
pub const STATION_PAUSE: Duration = Duration::from_secs(1);

/// Major ASOS stations of the Seoul capital area.
pub const DEFAULT_STATIONS: &[&str] = &["108", "112", "119", "203", "99", "201"];

/// First year collected when none is given
pub const DEFAULT_START_YEAR: i32 = 2021;

/// Last year collected when none is given
pub const DEFAULT_END_YEAR: i32 = 2024;

/// Directory holding chunk files, the manifest and the final output
pub const DEFAULT_DATA_DIR: &str = "data";

/// File name prefix of per-quarter chunk files
pub const DEFAULT_CHUNK_PREFIX: &str = "temp_asos_chunk_";

/// File name of the consolidated output
pub const DEFAULT_FINAL_FILENAME: &str = "asos_su-do-gwon_final.csv";

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

/// Calculate exponential backoff delay: `base * 2^attempt`, capped at [`MAX_BACKOFF`]
pub fn calculate_backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Backoff policy applied between attempts of one page
///
/// `attempt` is 0-based: the delay after the first failed attempt uses
/// `attempt = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Base delay after a timeout
    pub timeout_base: Duration,
    /// Base delay after a bad status
    pub status_base: Duration,
    /// Upper bound on any delay
    pub max_delay: Duration,
}

impl BackoffPolicy {
    /// Policy with custom bases and the default cap
    pub fn new(timeout_base: Duration, status_base: Duration) -> Self {
        Self {
            timeout_base,
            status_base,
            max_delay: MAX_BACKOFF,
        }
    }

    /// Delay before the attempt following `attempt`, given the failure that ended it
    pub fn delay_for(&self, error: &FetcherError, attempt: u32) -> Duration {
        let base = match error {
            FetcherError::Timeout => self.timeout_base,
            _ => self.status_base,
        };
        calculate_backoff(base, attempt).min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(TIMEOUT_BACKOFF_BASE, STATUS_BACKOFF_BASE)
    }
}

/// Resume modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// No manifest: every window is fetched and appended
    Off,
    /// Skip windows the manifest records as complete
    On,
    /// Delete the manifest, then behave like [`ResumeMode::On`]
    Reset,
}

impl ResumeMode {
    /// Whether a manifest is read and written in this mode
    pub fn uses_manifest(&self) -> bool {
        !matches!(self, ResumeMode::Off)
    }
}

impl FromStr for ResumeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(ResumeMode::Off),
            "on" => Ok(ResumeMode::On),
            "reset" => Ok(ResumeMode::Reset),
            _ => Err(format!(
                "Invalid resume mode: {s}. Valid options: on, off, reset"
            )),
        }
    }
}

/// Configuration errors, reported before any network traffic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No service key given
    #[error("service key is required (use --service-key or ASOS_SERVICE_KEY)")]
    MissingServiceKey,

    /// Empty station list
    #[error("at least one station id is required")]
    NoStations,

    /// Start year after end year
    #[error("start year {start} is after end year {end}")]
    InvalidYearRange {
        /// Configured start year
        start: i32,
        /// Configured end year
        end: i32,
    },

    /// Year outside the supported calendar range
    #[error("year {0} is outside {MIN_YEAR}..={MAX_YEAR}")]
    YearOutOfRange(i32),

    /// Zero attempts would never issue a request
    #[error("max attempts must be at least 1")]
    InvalidAttempts,

    /// Chunk prefix empty or containing a path separator
    #[error("invalid chunk prefix '{0}': must be a non-empty file name prefix")]
    InvalidChunkPrefix(String),

    /// Final file name unusable or indistinguishable from chunk files
    #[error("invalid final file name '{0}'")]
    InvalidFinalFilename(String),
}

/// Everything one run needs, passed explicitly into the executor
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Decoded service key issued by the data portal
    pub service_key: String,
    /// Stations fetched for every window, in order
    pub stations: Vec<StationId>,
    /// First year collected (inclusive)
    pub start_year: i32,
    /// Last year collected (inclusive)
    pub end_year: i32,
    /// Directory for chunk files, manifest and final output
    pub data_dir: PathBuf,
    /// File name prefix of chunk files
    pub chunk_prefix: String,
    /// File name of the final output inside `data_dir`
    pub final_filename: String,
    /// Attempts per page
    pub max_attempts: u32,
    /// Endpoint URL
    pub base_url: String,
    /// Resume behaviour
    pub resume: ResumeMode,
    /// Delete chunk files and manifest after a successful aggregation
    pub remove_chunks: bool,
    /// Backoff between attempts
    pub backoff: BackoffPolicy,
    /// Pause between pages
    pub page_pause: Duration,
    /// Pause between stations
    pub station_pause: Duration,
}

impl RunConfig {
    /// Configuration with defaults for everything except key, stations and years
    pub fn new(
        service_key: impl Into<String>,
        stations: Vec<StationId>,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            service_key: service_key.into(),
            stations,
            start_year,
            end_year,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            chunk_prefix: DEFAULT_CHUNK_PREFIX.to_string(),
            final_filename: DEFAULT_FINAL_FILENAME.to_string(),
            max_attempts: MAX_ATTEMPTS,
            base_url: DEFAULT_BASE_URL.to_string(),
            resume: ResumeMode::On,
            remove_chunks: false,
            backoff: BackoffPolicy::default(),
            page_pause: PAGE_PAUSE,
            station_pause: STATION_PAUSE,
        }
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the chunk file prefix
    pub fn with_chunk_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.chunk_prefix = prefix.into();
        self
    }

    /// Set the final file name
    pub fn with_final_filename(mut self, name: impl Into<String>) -> Self {
        self.final_filename = name.into();
        self
    }

    /// Set the number of attempts per page
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the resume mode
    pub fn with_resume(mut self, resume: ResumeMode) -> Self {
        self.resume = resume;
        self
    }

    /// Enable or disable chunk removal after aggregation
    pub fn with_remove_chunks(mut self, remove_chunks: bool) -> Self {
        self.remove_chunks = remove_chunks;
        self
    }

    /// Override backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Override pauses between pages and between stations
    pub fn with_pauses(mut self, page_pause: Duration, station_pause: Duration) -> Self {
        self.page_pause = page_pause;
        self.station_pause = station_pause;
        self
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_key.trim().is_empty() {
            return Err(ConfigError::MissingServiceKey);
        }
        if self.stations.is_empty() {
            return Err(ConfigError::NoStations);
        }
        for year in [self.start_year, self.end_year] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(ConfigError::YearOutOfRange(year));
            }
        }
        if self.start_year > self.end_year {
            return Err(ConfigError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts);
        }
        validate_file_names(&self.chunk_prefix, &self.final_filename)
    }

    /// Path naming for this configuration
    pub fn paths(&self) -> ChunkPaths {
        ChunkPaths::new(&self.data_dir, &self.chunk_prefix, &self.final_filename)
    }

    /// Location of the final output file
    pub fn final_path(&self) -> PathBuf {
        self.paths().final_path()
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Validate chunk prefix and final file name, shared with aggregate-only runs
pub fn validate_file_names(chunk_prefix: &str, final_filename: &str) -> Result<(), ConfigError> {
    let has_separator = |s: &str| s.contains('/') || s.contains('\\');

    if chunk_prefix.is_empty() || has_separator(chunk_prefix) {
        return Err(ConfigError::InvalidChunkPrefix(chunk_prefix.to_string()));
    }
    if final_filename.is_empty() || has_separator(final_filename) {
        return Err(ConfigError::InvalidFinalFilename(final_filename.to_string()));
    }
    if final_filename.starts_with(chunk_prefix) {
        return Err(ConfigError::InvalidFinalFilename(final_filename.to_string()));
    }
    Ok(())
}
