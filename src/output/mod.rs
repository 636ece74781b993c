//! Data output writers
//!
//! - [`csv`] - Chunk file writer with header-once append semantics
//! - [`aggregate`] - Consolidation of chunk files into the final output
//! - [`path`] - File naming inside the data directory

use std::path::PathBuf;

pub mod aggregate;
pub mod csv;
pub mod path;

pub use aggregate::{AggregateReport, ChunkAggregator};
pub use self::csv::{append_records, replace_records, ChunkWriteReport, ChunkWriter};
pub use path::ChunkPaths;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Aggregation found nothing to combine
    #[error("no chunk files matching '{prefix}*.csv' in {}", dir.display())]
    NoChunkFiles {
        /// Directory searched
        dir: PathBuf,
        /// Chunk file prefix searched for
        prefix: String,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Summary returned when the writer is closed
    type Report;

    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<Self::Report>;
}
