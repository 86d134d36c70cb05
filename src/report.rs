use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::detect::RunSummary;
use crate::download::naming::sanitize;
use crate::download::DownloadReport;
use crate::registry::Registry;

pub type Outputs = Vec<(String, String)>;

/// Where `key=value` lines go: the job runner's output file, or stdout.
pub enum OutputSink {
    File(PathBuf),
    Stdout,
}

impl OutputSink {
    pub fn write(&self, outputs: &Outputs) -> Result<()> {
        let mut text = String::new();
        for (key, value) in outputs {
            text.push_str(&format!("{}={}\n", key, value));
        }
        match self {
            OutputSink::File(path) => {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output file {}", path.display()))?;
                file.write_all(text.as_bytes())
                    .with_context(|| format!("Failed to write output file {}", path.display()))?;
            }
            OutputSink::Stdout => print!("{}", text),
        }
        Ok(())
    }
}

/// Collapse to one line and drop characters that break `key=value` parsing.
pub fn clean_value(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(*c, '_' | '-' | '.' | ':' | '(' | ')' | '>' | '/' | ',')
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn human_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        format!("{:.1} KB", kb)
    } else {
        format!("{:.1} MB", kb / 1024.0)
    }
}

pub fn registry_outputs(registry: &Registry) -> Outputs {
    vec![
        ("total_urls".to_string(), registry.len().to_string()),
        ("enabled_urls".to_string(), registry.enabled_count().to_string()),
        ("config_file".to_string(), registry.source().to_string()),
    ]
}

pub fn check_outputs(summary: &RunSummary) -> Outputs {
    let mut outputs = vec![
        ("changed".to_string(), summary.has_changes().to_string()),
        ("changed_ids".to_string(), summary.change_set.ids.join(",")),
        ("checked_count".to_string(), summary.checked_count().to_string()),
        ("changed_count".to_string(), summary.changed_count().to_string()),
    ];

    let mut details = Vec::new();
    for check in &summary.checks {
        let status = clean_value(&check.status());
        details.push(format!("{}: {}", clean_value(&check.id), status));
        outputs.push((format!("status_{}", sanitize(&check.id)), status));
    }
    outputs.push(("change_details".to_string(), details.join(" | ")));
    outputs
}

pub fn download_outputs(report: &DownloadReport) -> Outputs {
    let entries: Vec<String> = report
        .downloaded()
        .map(|o| {
            clean_value(&format!(
                "{} ({}) - {}",
                o.filename,
                human_size(o.byte_size),
                o.name
            ))
        })
        .collect();
    let names: Vec<&str> = report.downloaded().map(|o| o.filename.as_str()).collect();
    let failed: Vec<&str> = report.failed().map(|o| o.id.as_str()).collect();

    let list = if entries.is_empty() {
        "No files downloaded".to_string()
    } else {
        entries.join(" | ")
    };

    vec![
        ("downloaded_files_list".to_string(), list),
        ("downloaded_filenames".to_string(), names.join(", ")),
        ("total_downloaded".to_string(), names.len().to_string()),
        ("failed_downloads".to_string(), failed.join(",")),
    ]
}
