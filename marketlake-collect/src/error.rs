use std::path::PathBuf;

use marketlake_core::fetch::FetchError;
use marketlake_core::{ParseError, StoreError};
use thiserror::Error;

/// Why one collector item (page, coin, file, ticker) failed.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("raw archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },
}

impl CollectError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CollectError::Fetch(e) if e.is_rate_limit())
    }
}
