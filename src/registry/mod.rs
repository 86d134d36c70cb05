pub mod types;

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ConfigError;
use types::{RegistryDocument, RegistrySource, ResourceSpec, Settings};

/// Ordered, read-only set of watched resources plus global defaults.
#[derive(Debug, Clone)]
pub struct Registry {
    resources: Vec<ResourceSpec>,
    settings: Settings,
    source: RegistrySource,
}

impl Registry {
    pub fn new(resources: Vec<ResourceSpec>, settings: Settings) -> Result<Self, ConfigError> {
        let registry = Self {
            resources: resources.into_iter().map(normalize).collect(),
            settings,
            source: RegistrySource::Default,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Load the registry document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let doc: RegistryDocument =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let mut registry = Self::new(doc.urls, doc.settings)?;
        registry.source = RegistrySource::File(path.display().to_string());
        debug!(
            path = %path.display(),
            total = registry.resources.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Load from `path`, falling back to the single-default registry on any
    /// `ConfigError`.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "registry unavailable, using default");
                Self::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        Self {
            resources: vec![ResourceSpec {
                id: "default_url".to_string(),
                name: "Default URL".to_string(),
                location: "https://example.com/default.txt".to_string(),
                enabled: true,
                timeout_seconds: None,
                max_size_bytes: None,
            }],
            settings: Settings::default(),
            source: RegistrySource::Default,
        }
    }

    /// Resources in declaration order.
    pub fn list_resources(&self, include_disabled: bool) -> Vec<&ResourceSpec> {
        self.resources
            .iter()
            .filter(|r| include_disabled || r.enabled)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.resources.iter().filter(|r| r.enabled).count()
    }

    pub fn timeout_for(&self, spec: &ResourceSpec) -> u64 {
        spec.timeout_seconds.unwrap_or(self.settings.timeout_seconds)
    }

    pub fn max_size_for(&self, spec: &ResourceSpec) -> u64 {
        spec.max_size_bytes.unwrap_or_else(|| self.settings.max_size_bytes())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, spec) in self.resources.iter().enumerate() {
            if spec.id.trim().is_empty() {
                return Err(ConfigError::EmptyId { index });
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateId(spec.id.clone()));
            }
            if !is_fetchable(&spec.location) {
                return Err(ConfigError::InvalidLocation {
                    id: spec.id.clone(),
                    location: spec.location.clone(),
                });
            }
        }
        Ok(())
    }
}

fn normalize(mut spec: ResourceSpec) -> ResourceSpec {
    if spec.name.is_empty() {
        spec.name = spec.id.clone();
    }
    spec
}

fn is_fetchable(location: &str) -> bool {
    reqwest::Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_registry(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("urls_config.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_preserves_order_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            dir.path(),
            r#"{
                "urls": [
                    {"id": "b", "url": "https://x/b.txt", "timeout": 5},
                    {"id": "a", "name": "Alpha", "location": "https://x/a.txt", "enabled": false}
                ],
                "settings": {"max_file_size_mb": 2}
            }"#,
        );

        let registry = Registry::load(&path).unwrap();
        let all: Vec<_> = registry
            .list_resources(true)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(all, vec!["b", "a"]);

        let enabled: Vec<_> = registry
            .list_resources(false)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(enabled, vec!["b"]);

        let b = registry.get("b").unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(registry.timeout_for(b), 5);
        assert_eq!(registry.max_size_for(b), 2 * 1024 * 1024);

        let a = registry.get("a").unwrap();
        assert_eq!(a.display_name(), "Alpha");
        assert_eq!(registry.timeout_for(a), 30);
        assert_eq!(registry.enabled_count(), 1);
        assert_eq!(registry.source(), &RegistrySource::File(path.display().to_string()));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Registry::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(dir.path(), "{ not json");
        assert!(matches!(
            Registry::load(&path).unwrap_err(),
            ConfigError::Malformed { .. }
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Registry::new(
            vec![
                ResourceSpec::new("a", "https://x/1"),
                ResourceSpec::new("a", "https://x/2"),
            ],
            Settings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn test_unfetchable_location_rejected() {
        let err = Registry::new(
            vec![ResourceSpec::new("a", "ftp://x/1")],
            Settings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLocation { .. }));
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(registry.source(), &RegistrySource::Default);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_resources(false)[0].id, "default_url");
    }

    #[test]
    fn test_per_resource_max_size_overrides_settings() {
        let mut spec = ResourceSpec::new("a", "http://x/a.txt");
        spec.max_size_bytes = Some(10);
        let registry = Registry::new(vec![spec], Settings::default()).unwrap();
        assert_eq!(registry.max_size_for(registry.get("a").unwrap()), 10);
    }

    #[test]
    fn test_settings_accept_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            dir.path(),
            r#"{
                "urls": [
                    {"id": "a", "url": "https://x/a.txt"},
                    {"id": "b", "url": "https://x/b.txt", "maxSizeBytes": 10}
                ],
                "settings": {"timeoutSeconds": 5, "maxSizeBytes": 4096, "checkIntervalHours": 6}
            }"#,
        );

        let registry = Registry::load(&path).unwrap();
        let a = registry.get("a").unwrap();
        assert_eq!(registry.timeout_for(a), 5);
        assert_eq!(registry.max_size_for(a), 4096);
        assert_eq!(registry.max_size_for(registry.get("b").unwrap()), 10);
        assert_eq!(registry.settings().check_interval_hours, Some(6));
    }

    #[test]
    fn test_settings_size_in_megabytes() {
        let settings: Settings = serde_json::from_str(r#"{"maxFileSizeMb": 2}"#).unwrap();
        assert_eq!(settings.max_size_bytes(), 2 * 1024 * 1024);
        assert_eq!(settings.timeout_seconds, 30);
    }
}
