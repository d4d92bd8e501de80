use std::path::PathBuf;

use thiserror::Error;

use crate::graph::TransportError;

/// Why a single asset was not written. Never aborts the batch.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid source URL {url}: {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("No filename in source URL {0}")]
    NoFilename(String),

    #[error("Failed to create folder {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error {status} downloading {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Empty body downloading {url}")]
    EmptyBody { url: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Failures that come from the remote side, as opposed to a bad record
    /// or the local disk.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DownloadError::HttpStatus { .. }
                | DownloadError::EmptyBody { .. }
                | DownloadError::Transport(_)
        )
    }
}
