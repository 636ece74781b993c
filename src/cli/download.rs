//! Command line definitions and command implementations

use crate::downloader::config::{
    DEFAULT_CHUNK_PREFIX, DEFAULT_DATA_DIR, DEFAULT_END_YEAR, DEFAULT_FINAL_FILENAME,
    DEFAULT_START_YEAR, MAX_ATTEMPTS,
};
use crate::downloader::{
    aggregate_chunks, quarter_windows, DownloadExecutor, ResumeMode, RunConfig, RunSummary,
};
use crate::fetcher::asos_config::DEFAULT_BASE_URL;
use crate::output::{AggregateReport, ChunkPaths};
use crate::shutdown::SharedShutdown;
use crate::StationId;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use super::CliError;

/// ASOS hourly weather downloader CLI
#[derive(Parser, Debug)]
#[command(name = "asos-downloader")]
#[command(about = "Download hourly ASOS weather observations from the KMA public data portal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Directory for chunk files, manifest and final output
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// File name prefix of per-quarter chunk files
    #[arg(long, global = true, default_value = DEFAULT_CHUNK_PREFIX)]
    pub chunk_prefix: String,

    /// File name of the consolidated output inside the data directory
    #[arg(long, global = true, default_value = DEFAULT_FINAL_FILENAME)]
    pub final_filename: String,
}

impl Cli {
    /// Path naming derived from the global flags
    pub fn paths(&self) -> ChunkPaths {
        ChunkPaths::new(&self.data_dir, &self.chunk_prefix, &self.final_filename)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every quarter window, then aggregate the chunk files
    Download(DownloadArgs),

    /// Aggregate existing chunk files into the final file
    Aggregate(AggregateArgs),

    /// Print the planned quarter windows and their chunk files
    Windows(WindowsArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Decoded service key issued by the data portal
    #[arg(long, env = "ASOS_SERVICE_KEY", hide_env_values = true)]
    pub service_key: String,

    /// Station ids, comma separated
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["108", "112", "119", "203", "99", "201"]
    )]
    pub stations: Vec<StationId>,

    /// First year to collect (inclusive)
    #[arg(long, default_value_t = DEFAULT_START_YEAR)]
    pub start_year: i32,

    /// Last year to collect (inclusive)
    #[arg(long, default_value_t = DEFAULT_END_YEAR)]
    pub end_year: i32,

    /// Resume mode: on, off, or reset
    #[arg(long, default_value = "on")]
    pub resume: ResumeMode,

    /// Maximum attempts per page request (range: 1-20)
    #[arg(long, default_value_t = MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Delete chunk files and the manifest after a successful aggregation
    #[arg(long, default_value_t = false)]
    pub remove_chunks: bool,

    /// Endpoint URL of the getWthrDataList operation
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Disable the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Aggregate command arguments
#[derive(Parser, Debug)]
pub struct AggregateArgs {
    /// Delete chunk files and the manifest after a successful aggregation
    #[arg(long, default_value_t = false)]
    pub remove_chunks: bool,
}

/// Windows command arguments
#[derive(Parser, Debug)]
pub struct WindowsArgs {
    /// First year (inclusive)
    #[arg(long, default_value_t = DEFAULT_START_YEAR)]
    pub start_year: i32,

    /// Last year (inclusive)
    #[arg(long, default_value_t = DEFAULT_END_YEAR)]
    pub end_year: i32,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl DownloadArgs {
    /// Build the run configuration from these arguments and the global flags
    pub fn to_config(&self, cli: &Cli) -> RunConfig {
        RunConfig::new(
            self.service_key.clone(),
            self.stations.clone(),
            self.start_year,
            self.end_year,
        )
        .with_data_dir(cli.data_dir.clone())
        .with_chunk_prefix(cli.chunk_prefix.clone())
        .with_final_filename(cli.final_filename.clone())
        .with_max_attempts(self.max_attempts)
        .with_base_url(self.base_url.clone())
        .with_resume(self.resume)
        .with_remove_chunks(self.remove_chunks)
    }

    /// Run every window, then aggregate and print the summary
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = self.to_config(cli);
        config.validate()?;

        let mut executor = DownloadExecutor::from_config(config.clone())?.with_shutdown(shutdown);
        if !self.no_progress && cli.output_format == OutputFormat::Human {
            executor = executor.with_progress(create_progress_bar());
        }

        let summary = executor.run().await?;

        if summary.interrupted {
            warn!("Run interrupted - skipping aggregation; rerun to continue");
            print_download(cli.output_format, &config, &summary, None)?;
            return Ok(());
        }

        match aggregate_chunks(&config.paths(), config.remove_chunks) {
            Ok(report) => print_download(cli.output_format, &config, &summary, Some(&report)),
            Err(e) => {
                print_download(cli.output_format, &config, &summary, None)?;
                Err(CliError::Output(e))
            }
        }
    }
}

impl AggregateArgs {
    /// Aggregate existing chunks and print the report
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        crate::downloader::config::validate_file_names(&cli.chunk_prefix, &cli.final_filename)?;

        let report = aggregate_chunks(&cli.paths(), self.remove_chunks)?;
        info!(rows = report.rows, files = report.files.len(), "Aggregation finished");

        match cli.output_format {
            OutputFormat::Json => print_json(&json!({
                "status": "success",
                "aggregate": report,
                "chunks_removed": self.remove_chunks,
            })),
            OutputFormat::Human => {
                print_aggregate_human(&report);
                if self.remove_chunks {
                    println!("  Chunks removed: {}", report.files.len());
                }
                Ok(())
            }
        }
    }
}

impl WindowsArgs {
    /// Print planned windows with their chunk paths
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        if self.start_year > self.end_year {
            return Err(CliError::InvalidArgument(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }

        let paths = cli.paths();
        let windows = quarter_windows(self.start_year, self.end_year);

        match cli.output_format {
            OutputFormat::Json => {
                let entries: Vec<serde_json::Value> = windows
                    .iter()
                    .map(|w| {
                        json!({
                            "id": w.id(),
                            "start": w.start_stamp(),
                            "end": w.end_stamp(),
                            "chunk_path": paths.chunk_path(w),
                        })
                    })
                    .collect();
                print_json(&json!({ "windows": entries }))
            }
            OutputFormat::Human => {
                for w in &windows {
                    println!("{}  {}", w, paths.chunk_path(w).display());
                }
                println!("{} windows", windows.len());
                Ok(())
            }
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| CliError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn print_download(
    format: OutputFormat,
    config: &RunConfig,
    summary: &RunSummary,
    aggregate: Option<&AggregateReport>,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let status = if aggregate.is_some() {
                "success"
            } else if summary.interrupted {
                "interrupted"
            } else {
                "failed"
            };
            print_json(&json!({
                "status": status,
                "stations": config.stations,
                "start_year": config.start_year,
                "end_year": config.end_year,
                "summary": summary,
                "aggregate": aggregate,
            }))
        }
        OutputFormat::Human => {
            let status = if summary.interrupted {
                "interrupted"
            } else {
                "complete"
            };
            println!("Download {status}");
            println!(
                "  Windows: {} completed, {} partial, {} empty, {} skipped",
                summary.windows_completed,
                summary.windows_partial,
                summary.windows_empty,
                summary.windows_skipped
            );
            println!("  Records written: {}", summary.records_written);
            if summary.persist_failures > 0 {
                println!("  Chunk write failures: {}", summary.persist_failures);
            }
            for (window, station, outcome) in summary.failed_stations() {
                println!("  Incomplete: window {window}, station {station}: {outcome:?}");
            }
            if let Some(report) = aggregate {
                print_aggregate_human(report);
            }
            Ok(())
        }
    }
}

fn print_aggregate_human(report: &AggregateReport) {
    println!("Aggregation complete");
    println!("  Chunk files: {}", report.files.len());
    println!("  Rows: {}", report.rows);
    println!("  Columns: {}", report.columns.len());
    println!("  Output: {}", report.output.display());
    if report.dropped_fields > 0 {
        println!("  Dropped cells: {}", report.dropped_fields);
    }
}

/// Create the window progress bar
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
