use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

/// One watched resource as declared in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Stable identity key, never regenerated.
    pub id: String,
    /// Display label. Falls back to `id` when the declaration omits it.
    #[serde(default)]
    pub name: String,
    #[serde(alias = "url")]
    pub location: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, alias = "timeout", alias = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, alias = "maxSizeBytes")]
    pub max_size_bytes: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl ResourceSpec {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            location: location.into(),
            enabled: true,
            timeout_seconds: None,
            max_size_bytes: None,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Global defaults applied to resources that don't set their own limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout", alias = "timeoutSeconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_mb", alias = "maxFileSizeMb")]
    pub max_file_size_mb: u64,
    /// Byte-exact global limit; wins over `max_file_size_mb` when set.
    #[serde(
        default,
        rename = "max_size_bytes",
        alias = "maxSizeBytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_bytes: Option<u64>,
    /// Informational; scheduling is owned by the job runner.
    #[serde(default, alias = "checkIntervalHours")]
    pub check_interval_hours: Option<u64>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            max_bytes: None,
            check_interval_hours: Some(1),
        }
    }
}

impl Settings {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_bytes
            .unwrap_or_else(|| self.max_file_size_mb.saturating_mul(1024 * 1024))
    }
}

/// On-disk registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(alias = "resources")]
    pub urls: Vec<ResourceSpec>,
    #[serde(default)]
    pub settings: Settings,
}

/// Where the active registry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    File(String),
    Default,
}

impl std::fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrySource::File(path) => f.write_str(path),
            RegistrySource::Default => f.write_str("default"),
        }
    }
}
