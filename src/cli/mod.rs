//! CLI command implementations

pub mod download;
pub mod error;

pub use download::{AggregateArgs, Cli, Commands, DownloadArgs, OutputFormat, WindowsArgs};
pub use error::CliError;
