use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StateIoError;
use crate::fetch::{ContentFetcher, FetchLimits, FetchRecord};
use crate::registry::types::ResourceSpec;
use crate::registry::Registry;
use crate::store::types::{ChangeSet, StateEntry};
use crate::store::{save_change_set, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    FirstSeen,
    ContentChanged,
    Unchanged,
    FetchFailed,
}

impl Classification {
    /// Pure function of the prior observation and the current fetch.
    pub fn classify(prior: Option<&StateEntry>, current: &FetchRecord) -> Self {
        if !current.succeeded() {
            return Classification::FetchFailed;
        }
        match prior.and_then(|p| p.digest.as_deref()) {
            None => Classification::FirstSeen,
            Some(known) if Some(known) == current.digest.as_deref() => Classification::Unchanged,
            Some(_) => Classification::ContentChanged,
        }
    }

    /// Whether this resource belongs in the change set.
    pub fn is_change(self) -> bool {
        matches!(
            self,
            Classification::FirstSeen | Classification::ContentChanged
        )
    }
}

/// Which registry entries a run checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Enabled entries only.
    Enabled,
    /// Every entry, disabled ones included.
    All,
    /// Exactly these ids, disabled ones included; registry order is kept.
    Ids(Vec<String>),
}

/// Outcome for one checked resource.
#[derive(Debug, Clone)]
pub struct ResourceCheck {
    pub id: String,
    pub name: String,
    pub classification: Classification,
    pub record: FetchRecord,
    /// Size of the last known-good observation, if any.
    pub previous_size: Option<u64>,
}

impl ResourceCheck {
    pub fn status(&self) -> String {
        match self.classification {
            Classification::FirstSeen => "first check".to_string(),
            Classification::Unchanged => "no change".to_string(),
            Classification::ContentChanged => format!(
                "content changed: {} -> {} bytes",
                self.previous_size.unwrap_or(0),
                self.record.byte_size
            ),
            Classification::FetchFailed => format!(
                "fetch failed: {}",
                self.record.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// Run-level result handed to the reporting layer and the download stage.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub checks: Vec<ResourceCheck>,
    pub change_set: ChangeSet,
}

impl RunSummary {
    pub fn checked_count(&self) -> usize {
        self.checks.len()
    }

    pub fn changed_count(&self) -> usize {
        self.change_set.len()
    }

    pub fn has_changes(&self) -> bool {
        !self.change_set.is_empty()
    }
}

/// Next persisted entry for `spec` given its prior entry and this fetch.
///
/// Successful fetches always overwrite the entry. Failures keep the last
/// known-good digest and size so a later success compares against them.
pub fn next_entry(
    prior: Option<&StateEntry>,
    spec: &ResourceSpec,
    record: &FetchRecord,
    observed_at: DateTime<Utc>,
) -> StateEntry {
    if record.succeeded() {
        StateEntry {
            digest: record.digest.clone(),
            byte_size: record.byte_size,
            location: spec.location.clone(),
            name: spec.display_name().to_string(),
            observed_at,
            succeeded: true,
            last_error: None,
        }
    } else {
        StateEntry {
            digest: prior.and_then(|p| p.digest.clone()),
            byte_size: prior.map(|p| p.byte_size).unwrap_or(0),
            location: spec.location.clone(),
            name: spec.display_name().to_string(),
            observed_at,
            succeeded: false,
            last_error: record.error_detail.clone(),
        }
    }
}

pub struct ChangeDetector<'a> {
    registry: &'a Registry,
    fetcher: ContentFetcher,
    store: &'a StateStore,
    change_set_path: Option<&'a Path>,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(registry: &'a Registry, fetcher: ContentFetcher, store: &'a StateStore) -> Self {
        Self {
            registry,
            fetcher,
            store,
            change_set_path: None,
        }
    }

    /// Record the change set at `path` before the snapshot is committed, so a
    /// detected change is never persisted without its hand-off.
    pub fn with_change_set(mut self, path: &'a Path) -> Self {
        self.change_set_path = Some(path);
        self
    }

    fn targets(&self, selection: &Selection) -> Vec<&'a ResourceSpec> {
        match selection {
            Selection::Enabled => self.registry.list_resources(false),
            Selection::All => self.registry.list_resources(true),
            Selection::Ids(ids) => {
                for id in ids {
                    if self.registry.get(id).is_none() {
                        warn!(id = %id, "requested id not in registry, ignoring");
                    }
                }
                self.registry
                    .list_resources(true)
                    .into_iter()
                    .filter(|spec| ids.iter().any(|id| id == &spec.id))
                    .collect()
            }
        }
    }

    /// Check the selected resources, persist the change set and the updated
    /// snapshot, and return the summary. Only a state I/O failure aborts the run.
    pub async fn run(
        &self,
        selection: &Selection,
        run_id: &str,
    ) -> Result<RunSummary, StateIoError> {
        let mut state = self.store.load()?;
        let mut checks = Vec::new();
        let mut ids = Vec::new();

        for spec in self.targets(selection) {
            let limits = FetchLimits::for_spec(self.registry, spec);
            let record = self.fetcher.fetch(spec, limits).await.record;

            let prior = state.get(&spec.id);
            let classification = Classification::classify(prior, &record);
            let previous_size = prior.filter(|p| p.digest.is_some()).map(|p| p.byte_size);
            let entry = next_entry(prior, spec, &record, Utc::now());

            match classification {
                Classification::FetchFailed => warn!(
                    id = %spec.id,
                    error = record.error_detail.as_deref().unwrap_or(""),
                    "fetch failed"
                ),
                Classification::FirstSeen => {
                    info!(id = %spec.id, size = record.byte_size, "first seen")
                }
                Classification::ContentChanged => info!(
                    id = %spec.id,
                    old_size = previous_size.unwrap_or(0),
                    new_size = record.byte_size,
                    "content changed"
                ),
                Classification::Unchanged => {
                    info!(id = %spec.id, size = record.byte_size, "unchanged")
                }
            }

            state.insert(spec.id.clone(), entry);
            if classification.is_change() {
                ids.push(spec.id.clone());
            }
            checks.push(ResourceCheck {
                id: spec.id.clone(),
                name: spec.display_name().to_string(),
                classification,
                record,
                previous_size,
            });
        }

        let change_set = ChangeSet {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            ids,
        };
        if let Some(path) = self.change_set_path {
            save_change_set(path, &change_set)?;
        }
        self.store.save(&state)?;

        let summary = RunSummary { checks, change_set };
        info!(
            checked = summary.checked_count(),
            changed = summary.changed_count(),
            "check complete"
        );
        Ok(summary)
    }
}
