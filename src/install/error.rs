//! Typed errors for the installation engine.
//!
//! None of these ever escape an orchestration run; the controller turns them
//! into a `Failed` item status and a log line.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Item has no download location")]
    MissingLocation,

    #[error("Invalid download URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data received for {} seconds", .0.as_secs())]
    Stalled(Duration),

    #[error("Connection closed after {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    /// The operator dismissed or refused the elevation prompt
    #[error("Elevation was declined")]
    ElevationDenied,

    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse installer arguments: {0}")]
    Arguments(#[from] shell_words::ParseError),

    #[error("Failed waiting for installer: {0}")]
    Wait(String),

    #[error("Elevated launch is not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
