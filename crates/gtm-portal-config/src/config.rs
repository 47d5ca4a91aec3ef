/// Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Smallest auto-save interval accepted from the config file.
const MIN_SAVE_INTERVAL_MS: u64 = 1;

/// Revision history settings as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionSettings {
    /// Max revisions retained per item. Oldest entries are evicted first.
    pub max_revisions: usize,
    /// Whether drafts are auto-saved on a timer.
    pub auto_save: bool,
    /// Interval in milliseconds between draft auto-saves (minimum 1).
    pub save_interval_ms: u64,
}

impl Default for RevisionSettings {
    fn default() -> Self {
        Self {
            max_revisions: 50,
            auto_save: true,
            save_interval_ms: 30_000,
        }
    }
}

/// Top-level portal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub revisions: RevisionSettings,
    /// Directory holding the revision database. Empty = default data directory.
    /// A leading `~/` expands to the user's home directory.
    pub data_dir: String,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            revisions: RevisionSettings::default(),
            data_dir: String::new(),
            log_filter: "info".to_string(),
        }
    }
}

impl PortalConfig {
    /// Returns the config file path: exe directory + `gtm-portal.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("gtm-portal.json")))
            .unwrap_or_else(|| PathBuf::from("gtm-portal.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<PortalConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Return defaults on error (don't overwrite broken file)
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Returns the configured data directory, if one is set.
    ///
    /// A leading `~/` is expanded against the user's home directory.
    pub fn configured_data_dir(&self) -> Option<PathBuf> {
        let raw = self.data_dir.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return Some(home.join(rest));
            }
        }
        Some(PathBuf::from(raw))
    }

    /// Clamps values to valid ranges and resets invalid fields.
    ///
    /// A `data_dir` naming an existing file is cleared, since the revision
    /// database needs a directory there.
    pub fn sanitize(&mut self) {
        self.revisions.max_revisions = self.revisions.max_revisions.max(1);
        self.revisions.save_interval_ms = self.revisions.save_interval_ms.max(MIN_SAVE_INTERVAL_MS);
        if self.log_filter.trim().is_empty() {
            self.log_filter = "info".to_string();
        }
        self.data_dir = self.data_dir.trim().to_string();
        if let Some(dir) = self.configured_data_dir().filter(|d| d.is_file()) {
            tracing::warn!(
                "Configured data_dir {} is a file; using the default data directory",
                dir.display()
            );
            self.data_dir.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PortalConfig::default();
        assert_eq!(config.revisions.max_revisions, 50);
        assert!(config.revisions.auto_save);
        assert_eq!(config.revisions.save_interval_ms, 30_000);
        assert!(config.data_dir.is_empty());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_sanitize_clamps_max_revisions() {
        let mut config = PortalConfig::default();
        config.revisions.max_revisions = 0;
        config.sanitize();
        assert_eq!(config.revisions.max_revisions, 1);
    }

    #[test]
    fn test_sanitize_clamps_save_interval_minimum() {
        let mut config = PortalConfig::default();
        config.revisions.save_interval_ms = 0;
        config.sanitize();
        assert_eq!(config.revisions.save_interval_ms, 1);

        config.revisions.save_interval_ms = 10;
        config.sanitize();
        assert_eq!(config.revisions.save_interval_ms, 10);
    }

    #[test]
    fn test_sanitize_preserves_valid_values() {
        let mut config = PortalConfig::default();
        config.revisions.max_revisions = 7;
        config.revisions.save_interval_ms = 60_000;
        config.sanitize();
        assert_eq!(config.revisions.max_revisions, 7);
        assert_eq!(config.revisions.save_interval_ms, 60_000);
    }

    #[test]
    fn test_sanitize_restores_empty_log_filter() {
        let mut config = PortalConfig::default();
        config.log_filter = "   ".to_string();
        config.sanitize();
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_sanitize_trims_data_dir() {
        let mut config = PortalConfig {
            data_dir: "  /var/lib/gtm  ".to_string(),
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.data_dir, "/var/lib/gtm");
    }

    #[test]
    fn test_sanitize_clears_data_dir_pointing_at_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = PortalConfig {
            data_dir: file.path().display().to_string(),
            ..Default::default()
        };
        config.sanitize();
        assert!(config.data_dir.is_empty());
        assert!(config.configured_data_dir().is_none());
    }

    #[test]
    fn test_configured_data_dir_empty_is_none() {
        let config = PortalConfig::default();
        assert!(config.configured_data_dir().is_none());
    }

    #[test]
    fn test_configured_data_dir_plain_path() {
        let config = PortalConfig {
            data_dir: "/var/lib/gtm".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.configured_data_dir(),
            Some(PathBuf::from("/var/lib/gtm"))
        );
    }

    #[test]
    fn test_configured_data_dir_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = PortalConfig {
            data_dir: "~/gtm-data".to_string(),
            ..Default::default()
        };
        assert_eq!(config.configured_data_dir(), Some(home.join("gtm-data")));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let json = r#"{"revisions": {"max_revisions": 10}}"#;
        let parsed: PortalConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.revisions.max_revisions, 10);
        assert!(parsed.revisions.auto_save);
        assert_eq!(parsed.revisions.save_interval_ms, 30_000);
        assert_eq!(parsed.log_filter, "info");
    }
}
