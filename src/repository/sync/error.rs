use std::io;

use thiserror::Error;

/// Fatal failures of a sync run; none are retried
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to enumerate files")]
    Enumeration(#[source] anyhow::Error),

    #[error("record lookup failed")]
    Lookup(#[source] anyhow::Error),

    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("store rejected batch")]
    Commit(#[source] anyhow::Error),
}
