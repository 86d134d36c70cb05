use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StateIoError;

/// Result of materializing one changed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    pub id: String,
    pub name: String,
    pub location: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub byte_size: u64,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One line of the history log. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub downloads: Vec<DownloadOutcome>,
}

/// Append-only JSON Lines log of download runs.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &DownloadRecord) -> Result<(), StateIoError> {
        let mut line = serde_json::to_vec(record).map_err(StateIoError::Serialize)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StateIoError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StateIoError::Write {
                path: self.path.clone(),
                source,
            })?;
        // One write per record keeps each line whole.
        file.write_all(&line).map_err(|source| StateIoError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            path = %self.path.display(),
            run_id = %record.run_id,
            outcomes = record.downloads.len(),
            "history record appended"
        );
        Ok(())
    }

    /// All records, oldest first. Blank lines are ignored.
    #[cfg(test)]
    pub fn records(&self) -> Result<Vec<DownloadRecord>, StateIoError> {
        use std::io::{BufRead, BufReader};

        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StateIoError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| StateIoError::Read {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| StateIoError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
