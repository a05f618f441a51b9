//! Configuration management.
//!
//! Settings are read from an optional TOML file in the data directory, with
//! environment variables taking precedence for the remote OCR credentials.
//! Missing configuration is not an error: an unconfigured remote provider is
//! a known degraded mode that routes extraction to the local fallback.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::remote::RemoteOcrConfig;

/// Name of the config file inside the data directory.
const CONFIG_FILE: &str = "config.toml";

/// Subdirectory of the data directory holding cache records.
const CACHE_SUBDIR: &str = "ocr_cache";

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Remote OCR provider configuration.
    #[serde(default)]
    pub remote: RemoteOcrConfig,
}

/// Resolve the data directory: explicit flag, `DOCTEXT_DATA_DIR`, or the
/// platform data directory.
pub fn data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var("DOCTEXT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doctext")
}

/// Cache directory under the data directory.
pub fn cache_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_SUBDIR)
}

/// Load settings from `{data_dir}/config.toml` (if present) and apply
/// environment overrides. Never fails: an unreadable or invalid file falls
/// back to defaults.
pub fn load_settings(data_dir: &Path) -> Settings {
    let path = data_dir.join(CONFIG_FILE);
    let mut settings = read_settings_file(&path).unwrap_or_default();
    apply_env_overrides(&mut settings.remote);
    settings
}

fn read_settings_file(path: &Path) -> Option<Settings> {
    if !path.exists() {
        return None;
    }
    let data = fs::read_to_string(path).ok()?;
    match toml::from_str(&data) {
        Ok(settings) => {
            debug!(path = %path.display(), "loaded settings file");
            Some(settings)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
            None
        }
    }
}

fn apply_env_overrides(remote: &mut RemoteOcrConfig) {
    if let Ok(v) = std::env::var("DOCTEXT_OCR_PROJECT_ID") {
        remote.project_id = Some(v);
    }
    if let Ok(v) = std::env::var("DOCTEXT_OCR_LOCATION") {
        remote.location = v;
    }
    if let Ok(v) = std::env::var("DOCTEXT_OCR_PROCESSOR_ID") {
        remote.processor_id = Some(v);
    }
    if let Ok(v) = std::env::var("DOCTEXT_OCR_ACCESS_TOKEN") {
        remote.access_token = Some(v);
    }
    if let Ok(v) = std::env::var("DOCTEXT_OCR_ENDPOINT") {
        remote.endpoint = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_data_dir_explicit_wins() {
        let dir = data_dir(Some(Path::new("/tmp/doctext-test")));
        assert_eq!(dir, PathBuf::from("/tmp/doctext-test"));
    }

    #[test]
    fn test_cache_dir_under_data_dir() {
        let dir = cache_dir(Path::new("/data"));
        assert_eq!(dir, PathBuf::from("/data/ocr_cache"));
    }

    #[test]
    fn test_missing_settings_file_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(dir.path());
        assert!(!settings.remote.is_complete());
    }

    #[test]
    fn test_settings_file_parsed() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[remote]\nproject_id = \"proj\"\nprocessor_id = \"proc\"\naccess_token = \"tok\"\n",
        )
        .unwrap();

        let settings = load_settings(dir.path());
        assert!(settings.remote.is_complete());
        assert_eq!(settings.remote.location, "us");
    }

    #[test]
    fn test_invalid_settings_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "not [valid toml").unwrap();

        let settings = load_settings(dir.path());
        assert!(!settings.remote.is_complete());
    }
}
