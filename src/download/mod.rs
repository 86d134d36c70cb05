pub mod naming;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{DownloadError, StateIoError};
use crate::fetch::{ContentFetcher, FetchLimits};
use crate::registry::types::ResourceSpec;
use crate::registry::Registry;
use crate::store::history::{DownloadOutcome, DownloadRecord, HistoryLog};
use crate::store::types::ChangeSet;

/// Result of one selective-fetch run.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub record: DownloadRecord,
    /// Change-set ids with no registry entry at download time.
    pub skipped: Vec<String>,
}

impl DownloadReport {
    pub fn downloaded(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.record.downloads.iter().filter(|o| o.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.record.downloads.iter().filter(|o| !o.succeeded)
    }

    /// Some downloads failed; the run still completed.
    pub fn is_partial(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Re-fetches changed resources and writes them as uniquely named artifacts.
pub struct SelectiveFetcher<'a> {
    registry: &'a Registry,
    fetcher: ContentFetcher,
    output_dir: PathBuf,
    history: &'a HistoryLog,
}

impl<'a> SelectiveFetcher<'a> {
    pub fn new(
        registry: &'a Registry,
        fetcher: ContentFetcher,
        output_dir: impl Into<PathBuf>,
        history: &'a HistoryLog,
    ) -> Self {
        Self {
            registry,
            fetcher,
            output_dir: output_dir.into(),
            history,
        }
    }

    /// Download every id in `change_set`, in registry order, then append one
    /// history record. Per-resource failures are recorded, not returned; only
    /// a history append failure is an error.
    pub async fn fetch_changed(
        &self,
        change_set: &ChangeSet,
        run_id: &str,
    ) -> Result<DownloadReport, StateIoError> {
        let started = Utc::now();
        let run_timestamp = started.format(naming::RUN_TIMESTAMP_FORMAT).to_string();

        let skipped: Vec<String> = change_set
            .ids
            .iter()
            .filter(|id| self.registry.get(id).is_none())
            .cloned()
            .collect();
        for id in &skipped {
            warn!(id = %id, "changed id not in registry, skipping download");
        }

        let targets = self
            .registry
            .list_resources(true)
            .into_iter()
            .filter(|spec| change_set.ids.contains(&spec.id));

        let mut downloads = Vec::new();
        for spec in targets {
            let outcome = self.download_one(spec, &run_timestamp).await;
            downloads.push(outcome);
        }

        let record = DownloadRecord {
            timestamp: started,
            run_id: run_id.to_string(),
            downloads,
        };
        self.history.append(&record)?;

        let report = DownloadReport { record, skipped };
        info!(
            downloaded = report.downloaded().count(),
            failed = report.failed().count(),
            "download complete"
        );
        Ok(report)
    }

    async fn download_one(&self, spec: &ResourceSpec, run_timestamp: &str) -> DownloadOutcome {
        let filename = naming::artifact_name(spec, run_timestamp);
        let path = self.output_dir.join(&filename);
        let limits = FetchLimits::for_spec(self.registry, spec);

        info!(id = %spec.id, location = %spec.location, filename = %filename, "downloading");
        let fetched = self.fetcher.fetch(spec, limits).await;

        let result = match fetched.content {
            Some(content) => write_artifact(&spec.id, &path, &content).await,
            None => Err(DownloadError::Fetch {
                id: spec.id.clone(),
                detail: fetched
                    .record
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "no content".to_string()),
            }),
        };

        let mut outcome = DownloadOutcome {
            id: spec.id.clone(),
            name: spec.display_name().to_string(),
            location: spec.location.clone(),
            filename,
            filepath: None,
            digest: None,
            byte_size: 0,
            succeeded: false,
            error: None,
            timestamp: Utc::now(),
        };
        match result {
            Ok(()) => {
                info!(id = %spec.id, size = fetched.record.byte_size, "artifact written");
                outcome.filepath = Some(path);
                outcome.digest = fetched.record.digest;
                outcome.byte_size = fetched.record.byte_size;
                outcome.succeeded = true;
            }
            Err(e) => {
                warn!(id = %spec.id, error = %e, "download failed");
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }
}

async fn write_artifact(id: &str, path: &Path, content: &[u8]) -> Result<(), DownloadError> {
    let write_err = |source| DownloadError::Write {
        id: id.to_string(),
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, content).await.map_err(write_err)
}
