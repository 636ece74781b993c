//! CLI error types and conversions

use crate::downloader::{ConfigError, DownloadError};
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Summary could not be rendered
    #[error("serialization error: {0}")]
    Serialization(String),
}
