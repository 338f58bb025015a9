use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures surfaced by the sync pipeline.
///
/// Missing source mappings are not errors; they are collected into the run report.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("API cache file is missing: {path}. Run `locsync fetch` to refresh API data.")]
    MissingCache { path: PathBuf },

    #[error("invalid translation document {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SyncError::Json {
            path: path.into(),
            source,
        }
    }
}
