/// Export/import document for one item's revision history.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revision::{check_history, Revision};
use crate::timestamp;

/// Portable snapshot of an item's revisions.
///
/// ```json
/// { "itemId": "doc1", "exportedAt": "2025-01-01T00:00:00.000Z", "revisions": [ ... ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionExport {
    pub item_id: String,
    #[serde(with = "timestamp")]
    pub exported_at: DateTime<Utc>,
    pub revisions: Vec<Revision>,
}

impl RevisionExport {
    /// Snapshots `revisions` for `item_id`, stamped with the current time.
    pub fn new(item_id: &str, revisions: &[Revision]) -> Self {
        Self {
            item_id: item_id.to_string(),
            exported_at: timestamp::now(),
            revisions: revisions.to_vec(),
        }
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize revision export")
    }

    /// Parses an export document.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, missing fields, an empty item id,
    /// or a revision list that breaks the version or single-draft rules.
    pub fn parse(data: &str) -> Result<Self> {
        let export: Self =
            serde_json::from_str(data).context("Failed to parse revision export")?;
        anyhow::ensure!(
            !export.item_id.is_empty(),
            "Revision export has an empty item id"
        );
        check_history(&export.revisions)
            .with_context(|| format!("Invalid revision history for '{}'", export.item_id))?;
        Ok(export)
    }
}
