/// Configuration and utility functions for the revision store.
use std::path::{Path, PathBuf};
use std::time::Duration;

use gtm_portal_config::RevisionSettings;

/// Maximum number of revisions retained per item.
/// Oldest revisions are evicted when this limit is exceeded.
const DEFAULT_MAX_REVISIONS: usize = 50;

/// Interval between draft auto-saves.
const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest auto-save interval the scheduler will accept.
const MIN_SAVE_INTERVAL: Duration = Duration::from_millis(1);

/// Prefix of every persistence key.
const STORAGE_KEY_PREFIX: &str = "revisions_";

/// Configuration for the revision store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionConfig {
    /// Max revisions kept per item (drafts included).
    pub max_revisions: usize,
    /// Whether new drafts get a recurring auto-save task.
    pub auto_save: bool,
    /// Auto-save interval.
    pub save_interval: Duration,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            max_revisions: DEFAULT_MAX_REVISIONS,
            auto_save: true,
            save_interval: DEFAULT_SAVE_INTERVAL,
        }
    }
}

impl From<&RevisionSettings> for RevisionConfig {
    fn from(settings: &RevisionSettings) -> Self {
        let mut config = Self {
            max_revisions: settings.max_revisions,
            auto_save: settings.auto_save,
            save_interval: Duration::from_millis(settings.save_interval_ms),
        };
        config.sanitize();
        config
    }
}

impl RevisionConfig {
    /// Clamps values to ranges the store can work with.
    pub fn sanitize(&mut self) {
        self.max_revisions = self.max_revisions.max(1);
        self.save_interval = self.save_interval.max(MIN_SAVE_INTERVAL);
    }
}

/// Resolves the data directory path.
///
/// Resolution order:
/// 1. `GTM_PORTAL_DATA_DIR` environment variable, when set and non-empty
/// 2. `.data/` directory next to the executable
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GTM_PORTAL_DATA_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe.parent().unwrap_or(Path::new(".")).join(".data")
}

/// Returns the persistence key for an item's revision list.
pub fn storage_key(item_id: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{item_id}")
}

/// Returns the item id encoded in a persistence key, if it is one.
pub fn item_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(STORAGE_KEY_PREFIX)
}
