//! Consolidation of chunk files into the final output
//!
//! Two passes over the discovered chunks: the first collects the union of
//! their headers in first-seen order, the second streams every data row into
//! a temporary file aligned to that union. The temporary file is persisted
//! over the final path only after every row has been written.

use super::csv::{open_reader, UTF8_BOM};
use super::path::ChunkPaths;
use super::{OutputError, OutputResult};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Result of a successful aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    /// Chunk files combined, in processing order
    pub files: Vec<PathBuf>,
    /// Data rows written to the final file
    pub rows: u64,
    /// Final header
    pub columns: Vec<String>,
    /// Final file path
    pub output: PathBuf,
    /// Cells beyond the end of their file's header, not written
    pub dropped_fields: u64,
}

/// Combines chunk files matching a prefix into one CSV
pub struct ChunkAggregator {
    paths: ChunkPaths,
}

impl ChunkAggregator {
    /// Create an aggregator over `paths`
    pub fn new(paths: ChunkPaths) -> Self {
        Self { paths }
    }

    /// Chunk files in the data directory, sorted by file name
    ///
    /// A missing data directory yields an empty list.
    pub fn discover(&self) -> OutputResult<Vec<PathBuf>> {
        let dir = self.paths.data_dir();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(OutputError::IoError(format!(
                    "Failed to read directory {}: {e}",
                    dir.display()
                )))
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OutputError::IoError(format!("Failed to read entry: {e}")))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_file && self.paths.is_chunk_file_name(name) {
                files.push(entry.path());
            }
        }
        files.sort();

        debug!(dir = %dir.display(), files = files.len(), "Discovered chunk files");
        Ok(files)
    }

    /// Combine every chunk into the final file
    ///
    /// Fails with [`OutputError::NoChunkFiles`] and writes nothing when no
    /// chunk matches.
    pub fn combine(&self) -> OutputResult<AggregateReport> {
        let files = self.discover()?;
        if files.is_empty() {
            warn!(
                dir = %self.paths.data_dir().display(),
                prefix = self.paths.chunk_prefix(),
                "No chunk files to aggregate"
            );
            return Err(OutputError::NoChunkFiles {
                dir: self.paths.data_dir().to_path_buf(),
                prefix: self.paths.chunk_prefix().to_string(),
            });
        }

        info!(files = files.len(), "Aggregating chunk files");

        // Pass 1: union header
        let mut columns: Vec<String> = Vec::new();
        for file in &files {
            let mut reader = open_reader(file)?;
            let headers = reader.headers().map_err(|e| {
                OutputError::CsvError(format!("Failed to read header of {}: {e}", file.display()))
            })?;
            for name in headers.iter() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        let index: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        // Pass 2: stream rows into a temp file next to the output
        let output = self.paths.final_path();
        let tmp = NamedTempFile::new_in(self.paths.data_dir())
            .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;
        let mut buffered = BufWriter::new(tmp);
        buffered
            .write_all(UTF8_BOM)
            .map_err(|e| OutputError::IoError(format!("Failed to write signature: {e}")))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(buffered);
        writer
            .write_record(&columns)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

        let mut rows = 0u64;
        let mut dropped_fields = 0u64;
        for file in &files {
            let mut reader = open_reader(file)?;
            let mapping: Vec<usize> = reader
                .headers()
                .map_err(|e| OutputError::CsvError(format!("Failed to read header: {e}")))?
                .iter()
                .filter_map(|name| index.get(name).copied())
                .collect();

            let mut file_rows = 0u64;
            let mut file_dropped = 0u64;
            for record in reader.records() {
                let record = record.map_err(|e| {
                    OutputError::CsvError(format!("Failed to read row of {}: {e}", file.display()))
                })?;
                let mut row = vec![""; columns.len()];
                for (value, &target) in record.iter().zip(mapping.iter()) {
                    row[target] = value;
                }
                file_dropped += record.len().saturating_sub(mapping.len()) as u64;
                writer
                    .write_record(&row)
                    .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
                file_rows += 1;
            }

            if file_dropped > 0 {
                warn!(
                    file = %file.display(),
                    dropped_fields = file_dropped,
                    "Rows longer than the chunk header, extra cells were dropped"
                );
            }

            debug!(file = %file.display(), rows = file_rows, "Appended chunk");
            rows += file_rows;
            dropped_fields += file_dropped;
        }

        let buffered = writer
            .into_inner()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
        let tmp = buffered
            .into_inner()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;
        tmp.persist(&output)
            .map_err(|e| OutputError::IoError(format!("Failed to persist {}: {e}", output.display())))?;

        info!(
            output = %output.display(),
            files = files.len(),
            rows,
            columns = columns.len(),
            "Final file written"
        );

        Ok(AggregateReport {
            files,
            rows,
            columns,
            output,
            dropped_fields,
        })
    }

    /// Delete combined chunk files and the resume manifest
    pub fn remove_chunks(&self, files: &[PathBuf]) -> OutputResult<()> {
        for file in files {
            std::fs::remove_file(file).map_err(|e| {
                OutputError::IoError(format!("Failed to remove {}: {e}", file.display()))
            })?;
        }

        let manifest = self.paths.manifest_path();
        match std::fs::remove_file(&manifest) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(OutputError::IoError(format!(
                    "Failed to remove {}: {e}",
                    manifest.display()
                )))
            }
        }

        info!(files = files.len(), "Removed chunk files");
        Ok(())
    }
}
