use anyhow::{Context, Result};
use tracing::{info, warn};

use super::AppState;
use crate::download::{DownloadReport, SelectiveFetcher};
use crate::report;
use crate::store::history::HistoryLog;
use crate::store::load_change_set;
use crate::store::types::ChangeSet;

/// Download the given change set, or the one recorded by the last check.
pub async fn download(state: &AppState, change_set: Option<ChangeSet>) -> Result<DownloadReport> {
    let config = &state.config;

    let change_set = match change_set {
        Some(change_set) => change_set,
        None => load_change_set(&config.change_set_path)
            .context("Failed to read recorded change set")?
            .unwrap_or_else(|| {
                info!(
                    path = %config.change_set_path.display(),
                    "no recorded change set, nothing to download"
                );
                ChangeSet {
                    run_id: config.run_id.clone(),
                    created_at: chrono::Utc::now(),
                    ids: Vec::new(),
                }
            }),
    };

    if change_set.is_empty() {
        info!("no changed resources, skipping download");
    } else {
        info!(ids = ?change_set.ids, "downloading changed resources");
    }

    let history = HistoryLog::new(&config.history_path);
    let report = SelectiveFetcher::new(
        &state.registry,
        state.fetcher.clone(),
        &config.download_dir,
        &history,
    )
    .fetch_changed(&change_set, &config.run_id)
    .await
    .with_context(|| {
        format!(
            "Failed to append download history {}",
            history.path().display()
        )
    })?;

    config.output.write(&report::download_outputs(&report))?;

    if !report.skipped.is_empty() {
        warn!(
            ids = ?report.skipped,
            "changed ids missing from registry were skipped"
        );
    }

    if report.is_partial() {
        info!(
            failed = report.failed().count(),
            "download finished with failures"
        );
    }
    Ok(report)
}
