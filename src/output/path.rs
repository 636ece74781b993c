//! File naming inside the data directory
//!
//! ```text
//! data/
//!   temp_asos_chunk_20210101_20210331.csv   one per quarter window
//!   temp_asos_chunk_20210401_20210630.csv
//!   asos_su-do-gwon_final.csv               consolidated output
//!   .asos_manifest.json                     completed windows
//!   .asos_manifest.lock                     manifest write lock
//!   .asos_run.lock                          held for a whole download run
//! ```

use super::{OutputError, OutputResult};
use crate::downloader::window::QuarterWindow;
use std::path::{Path, PathBuf};

/// File name of the resume manifest
pub const MANIFEST_FILENAME: &str = ".asos_manifest.json";

/// File name of the run lock
pub const RUN_LOCK_FILENAME: &str = ".asos_run.lock";

/// Extension of chunk and final files
pub const CSV_EXTENSION: &str = "csv";

/// Path builder for chunk, final and manifest files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPaths {
    data_dir: PathBuf,
    chunk_prefix: String,
    final_filename: String,
}

impl ChunkPaths {
    /// Create a path builder
    pub fn new(
        data_dir: impl Into<PathBuf>,
        chunk_prefix: impl Into<String>,
        final_filename: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            chunk_prefix: chunk_prefix.into(),
            final_filename: final_filename.into(),
        }
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Chunk file prefix
    pub fn chunk_prefix(&self) -> &str {
        &self.chunk_prefix
    }

    /// `{data_dir}/{prefix}{start}_{end}.csv`
    pub fn chunk_path(&self, window: &QuarterWindow) -> PathBuf {
        self.data_dir.join(format!(
            "{}{}.{}",
            self.chunk_prefix,
            window.id(),
            CSV_EXTENSION
        ))
    }

    /// `{data_dir}/{final_filename}`
    pub fn final_path(&self) -> PathBuf {
        self.data_dir.join(&self.final_filename)
    }

    /// `{data_dir}/.asos_manifest.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(MANIFEST_FILENAME)
    }

    /// `{data_dir}/.asos_run.lock`
    pub fn run_lock_path(&self) -> PathBuf {
        self.data_dir.join(RUN_LOCK_FILENAME)
    }

    /// Whether a file name inside the data directory is a chunk file
    pub fn is_chunk_file_name(&self, name: &str) -> bool {
        name != self.final_filename
            && name.starts_with(&self.chunk_prefix)
            && Path::new(name)
                .extension()
                .is_some_and(|ext| ext == CSV_EXTENSION)
    }

    /// Create the data directory if it does not exist
    pub fn ensure_directories(&self) -> OutputResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {e}",
                self.data_dir.display()
            ))
        })
    }
}
