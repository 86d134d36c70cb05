use std::path::PathBuf;

use tracing::Level;

use crate::report::OutputSink;

const DEFAULT_REGISTRY: &str = ".github/scripts/urls_config.json";
const DEFAULT_STATE_FILE: &str = ".github/scripts/url_hashes.json";
const DEFAULT_HISTORY_FILE: &str = ".github/scripts/download_history.json";
const DEFAULT_CHANGESET_FILE: &str = ".github/scripts/changeset.json";
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Paths and run parameters supplied by the invoking job runner.
pub struct WatchConfig {
    pub registry_path: PathBuf,
    pub state_path: PathBuf,
    pub history_path: PathBuf,
    pub change_set_path: PathBuf,
    pub download_dir: PathBuf,
    pub output: OutputSink,
    pub run_id: String,
    pub log_level: Level,
}

impl WatchConfig {
    pub fn from_env() -> Self {
        let path = |key: &str, default: &str| {
            PathBuf::from(dotenv::var(key).unwrap_or_else(|_| default.to_string()))
        };

        let output = dotenv::var("WATCH_OUTPUT")
            .or_else(|_| dotenv::var("GITHUB_OUTPUT"))
            .ok()
            .filter(|p| !p.is_empty())
            .map(|p| OutputSink::File(PathBuf::from(p)))
            .unwrap_or(OutputSink::Stdout);

        let run_id = dotenv::var("WATCH_RUN_ID")
            .or_else(|_| dotenv::var("GITHUB_RUN_ID"))
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let log_level = dotenv::var("WATCH_LOG_LEVEL")
            .ok()
            .and_then(|l| l.parse::<Level>().ok())
            .unwrap_or(Level::INFO);

        Self {
            registry_path: path("WATCH_REGISTRY", DEFAULT_REGISTRY),
            state_path: path("WATCH_STATE_FILE", DEFAULT_STATE_FILE),
            history_path: path("WATCH_HISTORY_FILE", DEFAULT_HISTORY_FILE),
            change_set_path: path("WATCH_CHANGESET_FILE", DEFAULT_CHANGESET_FILE),
            download_dir: path("WATCH_DOWNLOAD_DIR", DEFAULT_DOWNLOAD_DIR),
            output,
            run_id,
            log_level,
        }
    }
}
