use anyhow::{Context, Result};
use tracing::info;

use super::AppState;
use crate::detect::{ChangeDetector, RunSummary, Selection};
use crate::report;
use crate::store::StateStore;

/// Run change detection and hand the change set to the download stage.
pub async fn check(state: &AppState, selection: &Selection) -> Result<RunSummary> {
    let config = &state.config;
    let store = StateStore::new(&config.state_path);

    info!(
        run_id = %config.run_id,
        registry = %state.registry.source(),
        ?selection,
        "checking resources"
    );

    let summary = ChangeDetector::new(&state.registry, state.fetcher.clone(), &store)
        .with_change_set(&config.change_set_path)
        .run(selection, &config.run_id)
        .await
        .context("Change detection aborted: change set or state could not be persisted")?;

    let mut outputs = report::registry_outputs(&state.registry);
    outputs.extend(report::check_outputs(&summary));
    config.output.write(&outputs)?;

    if summary.has_changes() {
        for resource in &summary.checks {
            if resource.classification.is_change() {
                info!(
                    id = %resource.id,
                    name = %resource.name,
                    status = %resource.status(),
                    "changed"
                );
            }
        }
        info!(ids = ?summary.change_set.ids, "changes detected");
    } else {
        info!("no changes detected");
    }
    Ok(summary)
}
