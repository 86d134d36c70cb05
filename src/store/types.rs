use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known observation for one resource id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// Freshest known-good digest. `None` until the first successful fetch.
    pub digest: Option<String>,
    pub byte_size: u64,
    pub location: String,
    pub name: String,
    pub observed_at: DateTime<Utc>,
    pub succeeded: bool,
    /// Failure detail of the most recent check, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Typed hand-off between the check and download stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Ids classified first-seen or content-changed, in registry order.
    pub ids: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
