use crate::registry::types::ResourceSpec;

pub const DEFAULT_EXTENSION: &str = ".bin";
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Last non-empty path segment of the location, or `{id}.bin`.
pub fn base_file_name(spec: &ResourceSpec) -> String {
    reqwest::Url::parse(&spec.location)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("{}{}", spec.id, DEFAULT_EXTENSION))
}

/// Split into (stem, extension). Leading dots belong to the stem, so
/// `.profile` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(pos) => name.split_at(leading + pos),
        None => (name, ""),
    }
}

/// Replace anything outside word characters, `-` and `.` with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{sanitized-stem}_{run_timestamp}{ext}`.
///
/// Two resources sharing a base name within the same second collide; the
/// later write wins.
pub fn artifact_name(spec: &ResourceSpec, run_timestamp: &str) -> String {
    let base = base_file_name(spec);
    let (stem, ext) = split_extension(&base);
    let ext = if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        sanitize(ext)
    };
    format!("{}_{}{}", sanitize(stem), run_timestamp, ext)
}
