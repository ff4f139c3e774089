use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by fetching and caching. Extraction itself never fails.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Transport failure: connect, timeout, body read, client build.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// Cache directory, cache file or local page could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScrapeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for transport and status failures, false for local disk errors.
    pub fn is_network(&self) -> bool {
        matches!(self, ScrapeError::Http(_) | ScrapeError::Status { .. })
    }
}
