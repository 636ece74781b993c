//! Integration tests for chunk aggregation

use asos_downloader::downloader::quarter_windows;
use asos_downloader::output::csv::open_reader;
use asos_downloader::output::{append_records, ChunkAggregator, ChunkPaths, OutputError};
use tempfile::TempDir;

use crate::support::mock_source::observation;

fn paths(dir: &TempDir) -> ChunkPaths {
    ChunkPaths::new(dir.path(), "temp_asos_chunk_", "asos_su-do-gwon_final.csv")
}

#[test]
fn test_k_chunks_of_r_rows_give_one_header() {
    const ROWS: usize = 37;
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let windows = quarter_windows(2021, 2022);

    for window in &windows {
        let records: Vec<_> = (0..ROWS)
            .map(|n| observation("108", &window.start_stamp(), n))
            .collect();
        append_records(&paths.chunk_path(window), &records).unwrap();
    }

    let report = ChunkAggregator::new(paths.clone()).combine().unwrap();
    assert_eq!(report.files.len(), windows.len());
    assert_eq!(report.rows, (windows.len() * ROWS) as u64);
    assert_eq!(report.columns, vec!["tm", "stnId", "ta"]);

    let mut reader = open_reader(&paths.final_path()).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), windows.len() * ROWS);
    // Chronological: rows of the first quarter come first, the last quarter last
    assert!(rows[0][0].starts_with("20210101"));
    assert!(rows[rows.len() - 1][0].starts_with("20221001"));

    let text = std::fs::read_to_string(paths.final_path()).unwrap();
    assert!(text.starts_with('\u{feff}'));
    assert_eq!(text.matches("tm,stnId,ta").count(), 1);
}

#[test]
fn test_unrelated_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let window = &quarter_windows(2021, 2021)[0];
    append_records(&paths.chunk_path(window), &[observation("99", "20210101", 0)]).unwrap();

    std::fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();
    std::fs::write(dir.path().join("temp_asos_chunk_backup.txt"), "x\n").unwrap();
    std::fs::create_dir(dir.path().join("temp_asos_chunk_dir.csv")).unwrap();

    let report = ChunkAggregator::new(paths).combine().unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.rows, 1);
}

#[test]
fn test_rerun_overwrites_final_file() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let window = &quarter_windows(2021, 2021)[0];
    let records: Vec<_> = (0..3).map(|n| observation("108", "20210101", n)).collect();
    append_records(&paths.chunk_path(window), &records).unwrap();

    let aggregator = ChunkAggregator::new(paths.clone());
    aggregator.combine().unwrap();
    let report = aggregator.combine().unwrap();

    assert_eq!(report.rows, 3);
    let text = std::fs::read_to_string(paths.final_path()).unwrap();
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_missing_data_dir_has_no_chunks() {
    let dir = TempDir::new().unwrap();
    let paths = ChunkPaths::new(
        dir.path().join("absent"),
        "temp_asos_chunk_",
        "asos_su-do-gwon_final.csv",
    );

    let result = ChunkAggregator::new(paths.clone()).combine();
    assert!(matches!(result, Err(OutputError::NoChunkFiles { .. })));
    assert!(!paths.final_path().exists());
}
