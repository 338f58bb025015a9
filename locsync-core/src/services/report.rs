use indexmap::IndexSet;
use log::{error, info};

use crate::lookup::Conflict;

/// Per-file counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub file: String,
    pub total: usize,
    pub processed: usize,
    pub updated: usize,
    pub unchanged: Vec<String>,
    pub missing: Vec<String>,
}

impl FileStats {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }
}

/// Result of one category task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub key: String,
    pub file: String,
    /// Keys the updater could not resolve. Empty when the task failed.
    pub missing: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// `(task key, stats)` in file-table order.
    pub stats: Vec<(String, FileStats)>,
    pub tasks: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.tasks.iter().filter(|t| t.error.is_some())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn stats_for(&self, key: &str) -> Option<&FileStats> {
        self.stats.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }
}

pub fn log_conflicts(conflicts: &IndexSet<Conflict>) {
    if conflicts.is_empty() {
        return;
    }
    info!("Conflicting feature translations detected:");
    for conflict in conflicts {
        info!(" - {}: {} vs {}", conflict.feature, conflict.first_scope, conflict.scope);
    }
}

pub fn summary_lines(key: &str, stats: &FileStats) -> Vec<String> {
    let mut lines = vec![format!(
        "- {key}: total {}, updated {}, unchanged {}, missing {}",
        stats.total,
        stats.updated,
        stats.unchanged.len(),
        stats.missing.len()
    )];
    if stats.updated == 0 && !stats.unchanged.is_empty() && stats.total > 0 {
        let sample: Vec<&str> = stats.unchanged.iter().take(3).map(String::as_str).collect();
        let more = if stats.unchanged.len() > sample.len() { ", ..." } else { "" };
        lines.push(format!(
            "  · Entries already matched API (sample unchanged keys: {}{more}",
            sample.join(", ")
        ));
    }
    lines
}

pub fn log_summary(report: &RunReport) {
    info!("Update summary:");
    for (key, stats) in &report.stats {
        for line in summary_lines(key, stats) {
            info!("{line}");
        }
    }
}

pub fn log_missing(report: &RunReport) {
    info!("Missing entries report:");
    for task in &report.tasks {
        let remaining: Vec<&String> = task.missing.iter().filter(|k| !k.is_empty()).collect();
        if remaining.is_empty() {
            continue;
        }
        info!("- {}: {} entries without updates", task.key, remaining.len());
        for key in remaining {
            info!("  * {key}");
        }
    }
}

pub fn log_failures(report: &RunReport) {
    for task in report.failed() {
        if let Some(err) = &task.error {
            error!("{} ({}) was not updated: {err}", task.key, task.file);
        }
    }
}
