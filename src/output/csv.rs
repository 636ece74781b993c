//! CSV chunk writer
//!
//! A chunk file starts with a UTF-8 signature and a header row. Appending to
//! an existing chunk reuses its header: values are written in the existing
//! column order, missing fields become empty cells and fields the header does
//! not know are dropped. The header is never written twice.

use crate::ObservationRecord;
use csv::{Reader, ReaderBuilder, StringRecord, Writer, WriterBuilder};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{OutputError, OutputResult, OutputWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// UTF-8 signature written at the start of every file
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Render one JSON value as a CSV cell
pub fn cell_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Union of record keys in order of first appearance
pub fn collect_columns(records: &[ObservationRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Open a CSV file for reading, skipping a leading UTF-8 signature
pub fn open_reader(path: &Path) -> OutputResult<Reader<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {e}", path.display())))?;
    let mut buffered = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);

    let starts_with_bom = buffered
        .fill_buf()
        .map_err(|e| OutputError::IoError(format!("Failed to read {}: {e}", path.display())))?
        .starts_with(UTF8_BOM);
    if starts_with_bom {
        buffered.consume(UTF8_BOM.len());
    }

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(buffered))
}

/// Header of an existing CSV file, `None` if the file is missing or empty
pub fn read_header(path: &Path) -> OutputResult<Option<Vec<String>>> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(OutputError::IoError(format!(
                "Failed to stat {}: {e}",
                path.display()
            )))
        }
    }

    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header of {}: {e}", path.display())))?;

    if headers.is_empty() {
        return Ok(None);
    }
    Ok(Some(headers.iter().map(str::to_string).collect()))
}

/// Outcome of writing records to one chunk file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkWriteReport {
    /// Chunk file written
    pub path: PathBuf,
    /// Data rows appended
    pub rows_written: u64,
    /// Whether this write created the header
    pub header_written: bool,
    /// Record fields dropped because the existing header lacks them
    pub dropped_fields: u64,
}

/// Appending writer for one chunk file
pub struct ChunkWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    columns: Vec<String>,
    rows_written: u64,
    header_written: bool,
    dropped_fields: u64,
}

impl ChunkWriter {
    /// Open `path` for appending
    ///
    /// A missing or empty file is created with a signature and a header built
    /// from `columns`. An existing file keeps its own header.
    ///
    /// # Arguments
    /// * `path` - Chunk file path
    /// * `columns` - Header to use when the file is new
    pub fn open<P: AsRef<Path>>(path: P, columns: &[String]) -> OutputResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let existing = read_header(path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|e| OutputError::IoError(format!("Failed to open file: {e}")))?;

        let (columns, header_written) = match existing {
            Some(header) => {
                ensure_trailing_newline(&mut file, path)?;
                debug!(path = %path.display(), columns = header.len(), "Appending to existing chunk");
                (header, false)
            }
            None => {
                file.set_len(0)
                    .map_err(|e| OutputError::IoError(format!("Failed to truncate file: {e}")))?;
                file.write_all(UTF8_BOM)
                    .map_err(|e| OutputError::IoError(format!("Failed to write signature: {e}")))?;
                (columns.to_vec(), true)
            }
        };

        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(buf_writer);

        if header_written {
            writer
                .write_record(&columns)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
            info!(path = %path.display(), columns = columns.len(), "Created chunk file");
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            columns,
            rows_written: 0,
            header_written,
            dropped_fields: 0,
        })
    }

    /// Columns rows are written in
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write a single record
    pub fn write_record(&mut self, record: &ObservationRecord) -> OutputResult<()> {
        let row = StringRecord::from(
            self.columns
                .iter()
                .map(|column| record.get(column).map(cell_value).unwrap_or_default())
                .collect::<Vec<String>>(),
        );

        let unknown = record
            .keys()
            .filter(|key| !self.columns.iter().any(|c| c == *key))
            .count() as u64;
        self.dropped_fields += unknown;

        self.writer
            .write_record(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
        self.rows_written += 1;

        // Flush periodically (every 1000 rows)
        if self.rows_written % 1000 == 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// Write multiple records at once
    pub fn write_records(&mut self, records: &[ObservationRecord]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }
}

impl OutputWriter for ChunkWriter {
    type Report = ChunkWriteReport;

    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<ChunkWriteReport> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {e}"))
        })?;
        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {e}"))
        })?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        if self.dropped_fields > 0 {
            warn!(
                path = %self.path.display(),
                dropped_fields = self.dropped_fields,
                "Fields missing from the existing chunk header were dropped"
            );
        }

        Ok(ChunkWriteReport {
            path: self.path,
            rows_written: self.rows_written,
            header_written: self.header_written,
            dropped_fields: self.dropped_fields,
        })
    }
}

/// Append `records` to the chunk file at `path`, creating it when needed
pub fn append_records(path: &Path, records: &[ObservationRecord]) -> OutputResult<ChunkWriteReport> {
    let columns = collect_columns(records);
    let mut writer = ChunkWriter::open(path, &columns)?;
    writer.write_records(records)?;
    writer.close()
}

/// Write `records` as the whole content of the chunk file at `path`
///
/// Rows left by an earlier, unrecorded attempt at the same window are
/// discarded and the header is written fresh.
pub fn replace_records(path: &Path, records: &[ObservationRecord]) -> OutputResult<ChunkWriteReport> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Discarded previous chunk file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(OutputError::IoError(format!(
                "Failed to remove {}: {e}",
                path.display()
            )))
        }
    }
    append_records(path, records)
}

/// Terminate a partially written last line so appended rows start fresh
fn ensure_trailing_newline(file: &mut File, path: &Path) -> OutputResult<()> {
    let len = file
        .metadata()
        .map_err(|e| OutputError::IoError(format!("Failed to stat {}: {e}", path.display())))?
        .len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| OutputError::IoError(format!("Failed to read {}: {e}", path.display())))?;

    if last[0] != b'\n' {
        warn!(path = %path.display(), "Chunk file did not end with a newline, terminating last row");
        file.write_all(b"\n")
            .map_err(|e| OutputError::IoError(format!("Failed to write {}: {e}", path.display())))?;
    }
    Ok(())
}
