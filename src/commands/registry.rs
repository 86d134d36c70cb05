use anyhow::Result;
use tracing::{info, warn};

use super::AppState;
use crate::report;

/// Log each declared resource and emit registry counts.
pub fn registry(state: &AppState) -> Result<()> {
    let registry = &state.registry;
    let settings = registry.settings();
    info!(
        source = %registry.source(),
        total = registry.len(),
        enabled = registry.enabled_count(),
        timeout_secs = settings.timeout_seconds,
        max_size_bytes = settings.max_size_bytes(),
        check_interval_hours = ?settings.check_interval_hours,
        "registry"
    );
    if registry.is_empty() {
        warn!("registry declares no resources");
    }
    for spec in registry.list_resources(true) {
        info!(
            id = %spec.id,
            name = %spec.display_name(),
            location = %spec.location,
            enabled = spec.enabled,
            timeout_secs = registry.timeout_for(spec),
            max_size_bytes = registry.max_size_for(spec),
            "resource"
        );
    }
    state.config.output.write(&report::registry_outputs(registry))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::testing::{app_state, output};
    use crate::fetch::testing::ScriptedSource;

    #[test]
    fn test_registry_writes_counts() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let state = app_state(dir.path(), source.clone());

        registry(&state).unwrap();
        assert_eq!(output(dir.path(), "total_urls").as_deref(), Some("2"));
        assert_eq!(output(dir.path(), "enabled_urls").as_deref(), Some("2"));
        assert!(source.calls().is_empty());
    }
}
