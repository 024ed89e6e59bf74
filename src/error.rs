use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Per-item failures. None of these abort a batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("provenance record {} is corrupt: {reason}", path.display())]
    RecordCorrupt { path: PathBuf, reason: String },

    #[error("{} was not ready after {waited:?}", path.display())]
    FetchTimeout { path: PathBuf, waited: Duration },

    #[error("audio acquisition failed: {0}")]
    Acquisition(String),

    #[error("failed to write provenance record {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
