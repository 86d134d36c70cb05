use std::path::PathBuf;

use thiserror::Error;

/// Registry document could not be read or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("registry file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read registry {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed registry {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate resource id: {0}")]
    DuplicateId(String),

    #[error("resource #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("resource {id} has an unusable location {location:?}")]
    InvalidLocation { id: String, location: String },
}

/// A single retrieval failed. Always recorded per resource, never fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid location {0}")]
    InvalidLocation(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("content exceeds size limit ({size} > {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout_secs)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err)
        }
    }
}

/// Persistence of state, change set or history failed. Fatal for the run.
#[derive(Debug, Error)]
pub enum StateIoError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Writing a downloaded artifact failed. Recorded per resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to fetch {id}: {detail}")]
    Fetch { id: String, detail: String },

    #[error("failed to write {} for {id}: {source}", .path.display())]
    Write {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
