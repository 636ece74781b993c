//! Unit tests for chunk file append semantics

use asos_downloader::output::csv::{open_reader, read_header};
use asos_downloader::output::{append_records, replace_records, ChunkWriter, OutputWriter};
use tempfile::TempDir;

use crate::support::mock_source::observation;

#[test]
fn test_two_appends_write_header_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("temp_asos_chunk_20210101_20210331.csv");

    let batch_a: Vec<_> = (0..7).map(|n| observation("108", "20210101", n)).collect();
    let batch_b: Vec<_> = (0..5).map(|n| observation("112", "20210101", n)).collect();

    let first = append_records(&path, &batch_a).unwrap();
    let second = append_records(&path, &batch_b).unwrap();
    assert!(first.header_written);
    assert!(!second.header_written);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 7 + 5);
    assert_eq!(lines.iter().filter(|l| l.ends_with("tm,stnId,ta")).count(), 1);

    let mut reader = open_reader(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["tm", "stnId", "ta"]);
    assert_eq!(reader.records().count(), 12);
}

#[test]
fn test_writer_reports_rows_and_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/chunk.csv");
    let columns = vec!["tm".to_string(), "stnId".to_string(), "ta".to_string()];

    let mut writer = ChunkWriter::open(&path, &columns).unwrap();
    for n in 0..1500 {
        writer.write_record(&observation("119", "20220101", n)).unwrap();
    }
    assert_eq!(writer.rows_written(), 1500);
    let report = writer.close().unwrap();

    assert_eq!(report.rows_written, 1500);
    assert_eq!(report.dropped_fields, 0);
    assert_eq!(read_header(&path).unwrap(), Some(columns));
}

#[test]
fn test_replace_discards_earlier_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("temp_asos_chunk_20230101_20230331.csv");

    let partial: Vec<_> = (0..4).map(|n| observation("108", "20230101", n)).collect();
    append_records(&path, &partial).unwrap();

    let full: Vec<_> = (0..4)
        .map(|n| observation("108", "20230101", n))
        .chain((0..3).map(|n| observation("112", "20230101", n)))
        .collect();
    let report = replace_records(&path, &full).unwrap();

    assert!(report.header_written);
    assert_eq!(report.rows_written, 7);
    let mut reader = open_reader(&path).unwrap();
    assert_eq!(reader.records().count(), 7);
}

#[test]
fn test_replace_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("temp_asos_chunk_20230401_20230630.csv");

    let report = replace_records(&path, &[observation("119", "20230401", 0)]).unwrap();

    assert!(report.header_written);
    assert_eq!(read_header(&path).unwrap().unwrap(), vec!["tm", "stnId", "ta"]);
}
