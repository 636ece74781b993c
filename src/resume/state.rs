//! Resume manifest persistence
//!
//! The manifest lists the quarter windows whose chunk files are complete so
//! a rerun can skip them instead of appending duplicate rows. Writes are
//! atomic (temp file + rename) and serialized through an fd-lock on a
//! sibling `.lock` file.

use super::checkpoint::WindowCheckpoint;
use crate::downloader::window::QuarterWindow;
use crate::StationId;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current manifest schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// Maximum allowed manifest size (10 MB) to prevent memory exhaustion
pub const MAX_STATE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Completed windows of one station set and year range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeManifest {
    schema_version: String,
    stations: Vec<StationId>,
    start_year: i32,
    end_year: i32,
    windows: BTreeMap<String, WindowCheckpoint>,
    created_at: i64,
    updated_at: i64,
}

impl ResumeManifest {
    /// Create an empty manifest for a run
    pub fn new(stations: Vec<StationId>, start_year: i32, end_year: i32) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            stations,
            start_year,
            end_year,
            windows: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stations the manifest was created for
    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    /// Completed window checkpoints keyed by window id
    pub fn windows(&self) -> &BTreeMap<String, WindowCheckpoint> {
        &self.windows
    }

    /// Whether `window` is recorded as complete
    pub fn is_complete(&self, window: &QuarterWindow) -> bool {
        self.windows.contains_key(&window.id())
    }

    /// Record a completed window
    pub fn mark_complete(&mut self, checkpoint: WindowCheckpoint) {
        debug!(
            window = checkpoint.window_id(),
            records = checkpoint.record_count(),
            "Marking window complete"
        );
        self.windows
            .insert(checkpoint.window_id().to_string(), checkpoint);
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    /// Total rows across completed windows
    pub fn total_records(&self) -> u64 {
        self.windows.values().map(WindowCheckpoint::record_count).sum()
    }

    /// Fail unless the manifest describes the same stations and years
    ///
    /// Station order matters: it determines row order inside chunk files.
    pub fn check_matches(
        &self,
        stations: &[StationId],
        start_year: i32,
        end_year: i32,
    ) -> Result<(), ResumeError> {
        if self.stations != stations {
            return Err(ResumeError::ConfigMismatch {
                field: "stations",
                manifest: join_stations(&self.stations),
                requested: join_stations(stations),
            });
        }
        if (self.start_year, self.end_year) != (start_year, end_year) {
            return Err(ResumeError::ConfigMismatch {
                field: "years",
                manifest: format!("{}-{}", self.start_year, self.end_year),
                requested: format!("{start_year}-{end_year}"),
            });
        }
        Ok(())
    }

    /// Save manifest to `path` atomically under the write lock
    pub fn save(&self, path: &Path) -> Result<(), ResumeError> {
        debug!(
            path = %path.display(),
            windows = self.windows.len(),
            "Saving resume manifest"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResumeError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path.with_extension("lock"))
            .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Fsync parent directory so the rename survives a crash
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        info!(
            path = %path.display(),
            windows = self.windows.len(),
            total_records = self.total_records(),
            "Resume manifest saved"
        );
        Ok(())
    }

    /// Load manifest from `path` under a shared lock
    pub fn load(path: &Path) -> Result<Self, ResumeError> {
        debug!(path = %path.display(), "Loading resume manifest");

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path.with_extension("lock"))
            .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata = std::fs::metadata(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(ResumeError::StateTooLarge {
                size: metadata.len(),
                max: MAX_STATE_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
        let manifest: ResumeManifest = serde_json::from_str(&contents).map_err(|e| {
            warn!(error = %e, "Failed to deserialize resume manifest");
            ResumeError::DeserializationError(e.to_string())
        })?;

        if manifest.schema_version != SCHEMA_VERSION {
            warn!(
                found_version = %manifest.schema_version,
                expected_version = SCHEMA_VERSION,
                "Resume manifest schema version mismatch"
            );
            return Err(ResumeError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: manifest.schema_version,
            });
        }

        info!(
            windows = manifest.windows.len(),
            total_records = manifest.total_records(),
            "Resume manifest loaded"
        );
        Ok(manifest)
    }

    /// Load the manifest at `path`, or `None` if there is none
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>, ResumeError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}

fn join_stations(stations: &[StationId]) -> String {
    stations
        .iter()
        .map(StationId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Errors related to resume state
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Manifest was written for a different run
    #[error(
        "resume manifest {field} mismatch: manifest has {manifest}, requested {requested} (rerun with --resume reset to start over)"
    )]
    ConfigMismatch {
        /// Field that differs
        field: &'static str,
        /// Value stored in the manifest
        manifest: String,
        /// Value of the current run
        requested: String,
    },

    /// Another run holds the data directory
    #[error("another download is already running (lock held on {})", .0.display())]
    AlreadyRunning(PathBuf),

    /// Schema version mismatch
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// State file too large
    #[error("state file too large: {size} bytes (max: {max} bytes)")]
    StateTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
