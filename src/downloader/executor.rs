//! Quarter-chunk download executor
//!
//! For each quarter window the executor fetches every configured station in
//! order, writes the concatenated records to the window's chunk file and,
//! when every station ended cleanly, records the window in the resume
//! manifest. With a manifest, a window that is not recorded is written from
//! scratch; with `--resume off` records are appended. Aggregation into the final file is a separate step
//! ([`aggregate_chunks`]) that runs after all windows are done.

use crate::downloader::config::{ResumeMode, RunConfig};
use crate::downloader::job::{RunSummary, StationReport, WindowReport, WindowStatus};
use crate::downloader::rate_limit::{Sleeper, TokioSleeper};
use crate::downloader::window::{quarter_windows, QuarterWindow};
use crate::downloader::DownloadError;
use crate::fetcher::asos_config::REQUEST_TIMEOUT;
use crate::fetcher::asos_http::AsosHttpClient;
use crate::fetcher::pagination::StationPaginator;
use crate::fetcher::retry::RetryController;
use crate::fetcher::PageSource;
use crate::output::{
    append_records, replace_records, AggregateReport, ChunkAggregator, ChunkPaths, OutputError,
};
use crate::resume::{ResumeManifest, RunLock, WindowCheckpoint};
use crate::shutdown::SharedShutdown;
use crate::ObservationRecord;
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Download executor driving one run over all quarter windows
pub struct DownloadExecutor {
    config: RunConfig,
    source: Arc<dyn PageSource>,
    sleeper: Arc<dyn Sleeper>,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl DownloadExecutor {
    /// Create an executor talking to the configured endpoint
    ///
    /// # Errors
    /// Returns [`DownloadError::Config`] for an invalid configuration and
    /// [`DownloadError::Fetcher`] if the HTTP client cannot be built.
    pub fn from_config(config: RunConfig) -> Result<Self, DownloadError> {
        config.validate()?;
        let client =
            AsosHttpClient::with_base_url(&config.service_key, &config.base_url, REQUEST_TIMEOUT)?;

        Ok(Self {
            config,
            source: Arc::new(client),
            sleeper: Arc::new(TokioSleeper),
            shutdown: None,
            progress: None,
        })
    }

    /// Replace the page source
    pub fn with_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the sleeper used for every pause and backoff delay
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report window progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configuration of this executor
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    /// Resolve the manifest according to the resume mode
    fn prepare_manifest(&self, paths: &ChunkPaths) -> Result<Option<ResumeManifest>, DownloadError> {
        let path = paths.manifest_path();
        let fresh = || {
            ResumeManifest::new(
                self.config.stations.clone(),
                self.config.start_year,
                self.config.end_year,
            )
        };

        match self.config.resume {
            ResumeMode::Off => Ok(None),
            ResumeMode::Reset => {
                // Chunks without a manifest would be appended to again
                let aggregator = ChunkAggregator::new(paths.clone());
                let chunks = aggregator.discover()?;
                aggregator.remove_chunks(&chunks)?;
                info!(
                    path = %path.display(),
                    chunks = chunks.len(),
                    "Reset resume manifest and chunk files"
                );
                Ok(Some(fresh()))
            }
            ResumeMode::On => match ResumeManifest::load_if_exists(&path)? {
                Some(manifest) => {
                    manifest.check_matches(
                        &self.config.stations,
                        self.config.start_year,
                        self.config.end_year,
                    )?;
                    info!(
                        completed_windows = manifest.windows().len(),
                        "Resuming from manifest"
                    );
                    Ok(Some(manifest))
                }
                None => Ok(Some(fresh())),
            },
        }
    }

    /// Fetch and persist every window
    ///
    /// # Errors
    /// Returns an error only for run-level problems: the data directory cannot
    /// be created, another run holds the lock or the manifest is unusable.
    /// Station and window failures are reported in the [`RunSummary`].
    pub async fn run(&self) -> Result<RunSummary, DownloadError> {
        let paths = self.config.paths();
        paths.ensure_directories()?;
        let _lock = RunLock::try_acquire(&paths.run_lock_path())?;

        let mut manifest = self.prepare_manifest(&paths)?;
        let windows = quarter_windows(self.config.start_year, self.config.end_year);

        let retry = RetryController::new(self.source.clone(), self.sleeper.clone())
            .with_policy(self.config.backoff)
            .with_max_attempts(self.config.max_attempts);
        let paginator = StationPaginator::new(retry, self.sleeper.clone())
            .with_page_pause(self.config.page_pause);

        info!(
            windows = windows.len(),
            stations = self.config.stations.len(),
            start_year = self.config.start_year,
            end_year = self.config.end_year,
            resume = ?self.config.resume,
            "Starting download run"
        );

        if let Some(pb) = &self.progress {
            pb.set_length(windows.len() as u64);
        }

        let mut summary = RunSummary::default();
        let mut first_station = true;

        for window in &windows {
            if self.shutdown_requested() {
                warn!(window = %window, "Shutdown requested - stopping before next window");
                summary.interrupted = true;
                break;
            }

            let chunk_path = paths.chunk_path(window);

            if manifest.as_ref().is_some_and(|m| m.is_complete(window)) {
                info!(window = %window, "Window already complete, skipping");
                summary.record(WindowReport::skipped(window, chunk_path));
                self.advance_progress(window);
                continue;
            }

            let report = self
                .run_window(&paginator, window, &paths, &mut first_station)
                .await;

            if report.status == WindowStatus::Interrupted {
                summary.record(report);
                break;
            }

            if let Some(manifest) = manifest.as_mut() {
                if is_recordable(&report) {
                    manifest.mark_complete(WindowCheckpoint::completed(
                        window,
                        report.records_written,
                        report.stations.len() as u32,
                    ));
                    if let Err(e) = manifest.save(&paths.manifest_path()) {
                        error!(window = %window, error = %e, "Failed to save resume manifest");
                    }
                }
            }

            summary.record(report);
            self.advance_progress(window);
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        info!(
            records_written = summary.records_written,
            completed = summary.windows_completed,
            partial = summary.windows_partial,
            empty = summary.windows_empty,
            skipped = summary.windows_skipped,
            persist_failures = summary.persist_failures,
            interrupted = summary.interrupted,
            "Download run finished"
        );

        Ok(summary)
    }

    /// Fetch every station for one window and persist the result
    async fn run_window(
        &self,
        paginator: &StationPaginator,
        window: &QuarterWindow,
        paths: &ChunkPaths,
        first_station: &mut bool,
    ) -> WindowReport {
        let chunk_path = paths.chunk_path(window);
        info!(window = %window, "Processing window");

        let mut stations: Vec<StationReport> = Vec::with_capacity(self.config.stations.len());
        let mut records: Vec<ObservationRecord> = Vec::new();

        for station in &self.config.stations {
            if self.shutdown_requested() {
                warn!(
                    window = %window,
                    station = %station,
                    "Shutdown requested - abandoning window without persisting"
                );
                return WindowReport {
                    window_id: window.id(),
                    chunk_path,
                    status: WindowStatus::Interrupted,
                    records_written: 0,
                    stations,
                    error: None,
                };
            }

            if !*first_station {
                self.sleeper.sleep(self.config.station_pause).await;
            }
            *first_station = false;

            let fetch = paginator
                .fetch_station(station, window.start, window.end)
                .await;
            stations.push(StationReport::from(&fetch));
            records.extend(fetch.records);
        }

        let clean = stations.iter().all(|s| s.outcome.is_clean());

        if records.is_empty() {
            warn!(window = %window, "No records for window, nothing written");
            return WindowReport {
                window_id: window.id(),
                chunk_path,
                status: WindowStatus::Empty,
                records_written: 0,
                stations,
                error: None,
            };
        }

        // Off appends like a plain rerun; with a manifest an unrecorded window starts over
        let persisted = if self.config.resume.uses_manifest() {
            replace_records(&chunk_path, &records)
        } else {
            append_records(&chunk_path, &records)
        };

        match persisted {
            Ok(written) => {
                info!(
                    window = %window,
                    path = %chunk_path.display(),
                    records = written.rows_written,
                    "Saved window chunk"
                );
                WindowReport {
                    window_id: window.id(),
                    chunk_path,
                    status: if clean {
                        WindowStatus::Completed
                    } else {
                        WindowStatus::Partial
                    },
                    records_written: written.rows_written,
                    stations,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    window = %window,
                    path = %chunk_path.display(),
                    error = %e,
                    "Failed to save window chunk"
                );
                WindowReport {
                    window_id: window.id(),
                    chunk_path,
                    status: WindowStatus::PersistFailed,
                    records_written: 0,
                    stations,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn advance_progress(&self, window: &QuarterWindow) {
        if let Some(pb) = &self.progress {
            pb.set_message(window.to_string());
            pb.inc(1);
        }
    }
}

/// Whether a window report may be recorded as complete in the manifest
fn is_recordable(report: &WindowReport) -> bool {
    matches!(report.status, WindowStatus::Completed | WindowStatus::Empty)
        && report.all_stations_clean()
}

/// Combine all chunk files into the final output, optionally removing them
///
/// # Errors
/// Returns [`OutputError::NoChunkFiles`] when there is nothing to combine; no
/// final file is written and chunk files are left untouched.
pub fn aggregate_chunks(
    paths: &ChunkPaths,
    remove_chunks: bool,
) -> Result<AggregateReport, OutputError> {
    let aggregator = ChunkAggregator::new(paths.clone());
    let report = aggregator.combine()?;
    if remove_chunks {
        aggregator.remove_chunks(&report.files)?;
    }
    Ok(report)
}
