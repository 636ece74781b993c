//! Unit tests for CLI argument parsing

use asos_downloader::cli::download::{Cli, Commands, OutputFormat};
use asos_downloader::downloader::config::{ResumeMode, DEFAULT_STATIONS};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_download_defaults() {
    let cli = Cli::parse_from(["asos-downloader", "download", "--service-key", "abc"]);

    assert_eq!(cli.output_format, OutputFormat::Human);
    assert_eq!(cli.data_dir, PathBuf::from("data"));
    assert_eq!(cli.chunk_prefix, "temp_asos_chunk_");
    assert_eq!(cli.final_filename, "asos_su-do-gwon_final.csv");

    let Commands::Download(ref args) = cli.command else {
        panic!("Expected download command");
    };
    let stations: Vec<&str> = args.stations.iter().map(|s| s.as_str()).collect();
    assert_eq!(stations, DEFAULT_STATIONS);
    assert_eq!(args.start_year, 2021);
    assert_eq!(args.end_year, 2024);
    assert_eq!(args.resume, ResumeMode::On);
    assert_eq!(args.max_attempts, 3);
    assert!(!args.remove_chunks);

    let config = args.to_config(&cli);
    assert!(config.validate().is_ok());
    assert_eq!(config.stations.len(), 6);
}

#[test]
fn test_download_custom_arguments() {
    let cli = Cli::parse_from([
        "asos-downloader",
        "--output-format",
        "json",
        "--data-dir",
        "/tmp/asos",
        "download",
        "--service-key",
        "abc",
        "--stations",
        "108,119",
        "--start-year",
        "2022",
        "--end-year",
        "2022",
        "--resume",
        "reset",
        "--max-attempts",
        "5",
        "--remove-chunks",
    ]);

    assert_eq!(cli.output_format, OutputFormat::Json);
    let Commands::Download(ref args) = cli.command else {
        panic!("Expected download command");
    };
    let config = args.to_config(&cli);

    assert_eq!(config.data_dir, PathBuf::from("/tmp/asos"));
    assert_eq!(config.stations.len(), 2);
    assert_eq!(config.stations[1].as_str(), "119");
    assert_eq!((config.start_year, config.end_year), (2022, 2022));
    assert_eq!(config.resume, ResumeMode::Reset);
    assert_eq!(config.max_attempts, 5);
    assert!(config.remove_chunks);
}

#[test]
fn test_invalid_station_rejected() {
    let result = Cli::try_parse_from([
        "asos-downloader",
        "download",
        "--service-key",
        "abc",
        "--stations",
        "108,SEOUL",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_max_attempts_range_enforced() {
    let result = Cli::try_parse_from([
        "asos-downloader",
        "download",
        "--service-key",
        "abc",
        "--max-attempts",
        "0",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_windows_and_aggregate_commands() {
    let cli = Cli::parse_from(["asos-downloader", "windows", "--start-year", "2023", "--end-year", "2023"]);
    assert!(matches!(cli.command, Commands::Windows(ref a) if a.start_year == 2023));

    let cli = Cli::parse_from(["asos-downloader", "aggregate", "--remove-chunks"]);
    assert!(matches!(cli.command, Commands::Aggregate(ref a) if a.remove_chunks));
}
