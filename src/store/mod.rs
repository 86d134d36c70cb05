pub mod history;
pub mod types;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StateIoError;
use types::{ChangeSet, StateEntry};

pub type StateMap = BTreeMap<String, StateEntry>;

/// File-backed id -> StateEntry mapping, replaced wholesale on every save.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Prior snapshot. A missing file means first run and yields an empty map.
    pub fn load(&self) -> Result<StateMap, StateIoError> {
        match read_json(&self.path)? {
            Some(entries) => Ok(entries),
            None => {
                debug!(path = %self.path.display(), "no prior state, first run");
                Ok(StateMap::new())
            }
        }
    }

    pub fn save(&self, entries: &StateMap) -> Result<(), StateIoError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(StateIoError::Serialize)?;
        atomic_write(&self.path, &bytes)?;
        debug!(path = %self.path.display(), entries = entries.len(), "state saved");
        Ok(())
    }
}

pub fn save_change_set(path: &Path, change_set: &ChangeSet) -> Result<(), StateIoError> {
    let bytes = serde_json::to_vec_pretty(change_set)
        .map_err(StateIoError::Serialize)?;
    atomic_write(path, &bytes)
}

/// `None` when no check stage has produced a change set yet.
pub fn load_change_set(path: &Path) -> Result<Option<ChangeSet>, StateIoError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StateIoError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateIoError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StateIoError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> StateIoError {
    let path = path.to_path_buf();
    move |source| StateIoError::Write { path, source }
}

/// Write to a sibling temp file, sync, then rename over `path`.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StateIoError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err(parent))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    let mut file = std::fs::File::create(&tmp_path)
        .map_err(write_err(&tmp_path))?;
    file.write_all(content).map_err(write_err(&tmp_path))?;
    file.sync_all().map_err(write_err(&tmp_path))?;
    drop(file);

    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        StateIoError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(digest: &str, size: u64) -> StateEntry {
        StateEntry {
            digest: Some(digest.to_string()),
            byte_size: size,
            location: "http://x/a.txt".to_string(),
            name: "a".to_string(),
            observed_at: Utc::now(),
            succeeded: true,
            last_error: None,
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/state.json"));

        let mut entries = StateMap::new();
        entries.insert("a".to_string(), entry("d1", 100));
        store.save(&entries).unwrap();

        assert_eq!(store.load().unwrap(), entries);
        assert!(!dir.path().join("nested/.state.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut first = StateMap::new();
        first.insert("a".to_string(), entry("d1", 1));
        first.insert("b".to_string(), entry("d2", 2));
        store.save(&first).unwrap();

        let mut second = StateMap::new();
        second.insert("a".to_string(), entry("d3", 3));
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), second);
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let err = StateStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StateIoError::Corrupt { .. }));
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();
        let store = StateStore::new(blocker.join("state.json"));
        let err = store.save(&StateMap::new()).unwrap_err();
        assert!(matches!(err, StateIoError::Write { .. }));
    }

    #[test]
    fn test_change_set_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changeset.json");
        assert!(load_change_set(&path).unwrap().is_none());

        let change_set = ChangeSet {
            run_id: "42".to_string(),
            created_at: Utc::now(),
            ids: vec!["a".to_string(), "c".to_string()],
        };
        save_change_set(&path, &change_set).unwrap();
        assert_eq!(load_change_set(&path).unwrap(), Some(change_set));
    }
}
