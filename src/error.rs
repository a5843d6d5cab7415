use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while auditing a vendor tree.
///
/// Whether a variant aborts the run depends on where it is raised: a
/// [`ScanError::ReadFile`] only ever affects the file it names, while a
/// [`ScanError::ReadDir`] on the vendor root or a host directory is fatal.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unable to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("classification of {} failed: {message}", path.display())]
    Worker { path: PathBuf, message: String },

    #[error("couldn't classify license(s) in {files} candidate file(s)")]
    NoMatches { files: usize },

    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("audit cancelled")]
    Cancelled,

    #[error("unable to write report to {}: {source}", path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid allow-list {}: {message}", path.display())]
    AllowList { path: PathBuf, message: String },
}

impl ScanError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Timeout(_))
    }
}
