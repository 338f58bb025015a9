pub mod overrides;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

pub const DEFAULT_CONFIG_FILE: &str = "locsync.json";
pub const QUIET_ENV: &str = "UPDATE_TRANSLATIONS_QUIET";
pub const SKIP_API_REFRESH_ENV: &str = "SKIP_API_REFRESH";

fn default_translations_dir() -> PathBuf {
    PathBuf::from("module/translations")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("tmp_data/api")
}

fn default_original_dir() -> PathBuf {
    PathBuf::from("original")
}

fn default_api_base_url() -> String {
    "https://daggerheart.su/api".to_string()
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ru".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Languages {
    #[serde(default = "default_source_language", alias = "source_lang")]
    pub source: String,

    #[serde(default = "default_target_language", alias = "target_lang")]
    pub target: String,
}

impl Default for Languages {
    fn default() -> Self {
        Self {
            source: default_source_language(),
            target: default_target_language(),
        }
    }
}

/// Where the sync job reads and writes. Every field has a default so an absent or partial
/// `locsync.json` is valid.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default = "default_translations_dir")]
    pub translations_dir: PathBuf,

    #[serde(default = "default_cache_dir", alias = "api_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_original_dir")]
    pub original_dir: PathBuf,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub languages: Languages,

    #[serde(default)]
    pub quiet: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            translations_dir: default_translations_dir(),
            cache_dir: default_cache_dir(),
            original_dir: default_original_dir(),
            api_base_url: default_api_base_url(),
            languages: Languages::default(),
            quiet: false,
        }
    }
}

impl SyncConfig {
    /// Reads the config file. An explicit path must exist; the default `locsync.json` is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(SyncError::Config {
                    path,
                    reason: "file does not exist".into(),
                });
            }
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
        serde_json::from_str(&text).map_err(|e| SyncError::Config {
            path,
            reason: e.to_string(),
        })
    }

    /// `UPDATE_TRANSLATIONS_QUIET=1` forces quiet mode.
    pub fn apply_env(&mut self) {
        if env_flag(QUIET_ENV) {
            self.quiet = true;
        }
    }

    pub fn cache_file(&self, lang: &str, endpoint: &str) -> PathBuf {
        self.cache_dir.join(lang).join(format!("{endpoint}.json"))
    }
}

pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: SyncConfig =
            serde_json::from_str(r#"{"translations_dir":"out","languages":{"target_lang":"uk"}}"#)
                .unwrap();
        assert_eq!(cfg.translations_dir, PathBuf::from("out"));
        assert_eq!(cfg.cache_dir, PathBuf::from("tmp_data/api"));
        assert_eq!(cfg.languages.source, "en");
        assert_eq!(cfg.languages.target, "uk");
        assert!(!cfg.quiet);
    }

    #[test]
    fn cache_file_layout() {
        let cfg = SyncConfig::default();
        assert_eq!(
            cfg.cache_file("ru", "domain-card"),
            PathBuf::from("tmp_data/api/ru/domain-card.json")
        );
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = SyncConfig::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }
}
