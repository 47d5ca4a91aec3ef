/// Revision store: per-item revision lists, drafts, and auto-save.
///
/// Every public operation is total. Missing items, versions, or drafts are
/// reported through `Option`, `bool`, or empty slices. Storage failures are
/// logged and swallowed; the in-memory lists stay authoritative.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::autosave::AutoSaveScheduler;
use crate::config::{storage_key, RevisionConfig};
use crate::diff::RevisionDiff;
use crate::revision::{check_history, Metadata, Revision, RevisionKind, RevisionSummary};
use crate::storage::RevisionStorage;
use crate::transfer::RevisionExport;

/// Summary used for auto-save ticks.
const AUTO_SAVED: &str = "Auto-saved";

/// Owns the revision history of every item, keyed by item id.
///
/// Construct one store at application start and call [`RevisionStore::shutdown`]
/// (or drop it) on exit. The host event loop drives draft auto-saves by
/// calling [`RevisionStore::run_due_autosaves`] periodically.
pub struct RevisionStore {
    /// Revision lists, each ordered by version ascending (oldest first).
    revisions: HashMap<String, Vec<Revision>>,
    /// Pending draft auto-save tasks.
    autosave: AutoSaveScheduler,
    /// Configuration parameters.
    config: RevisionConfig,
    /// Optional persistence mirror (None = in-memory only).
    storage: Option<Arc<dyn RevisionStorage>>,
}

impl std::fmt::Debug for RevisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionStore")
            .field("items", &self.revisions.len())
            .field("pending_autosaves", &self.autosave.len())
            .field("config", &self.config)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl RevisionStore {
    /// Creates an empty store.
    ///
    /// Pass `storage: None` for in-memory-only mode.
    pub fn new(mut config: RevisionConfig, storage: Option<Arc<dyn RevisionStorage>>) -> Self {
        config.sanitize();
        Self {
            revisions: HashMap::new(),
            autosave: AutoSaveScheduler::new(),
            config,
            storage,
        }
    }

    /// Creates an in-memory-only store with default config.
    pub fn in_memory() -> Self {
        Self::new(RevisionConfig::default(), None)
    }

    pub fn config(&self) -> &RevisionConfig {
        &self.config
    }

    // ── Creation ──────────────────────────────────────────────────────

    /// Appends a published revision and mirrors the item to storage.
    ///
    /// Trims the oldest entries once the list exceeds `max_revisions`.
    pub fn create_revision(
        &mut self,
        item_id: &str,
        content: &str,
        kind: RevisionKind,
        author: &str,
        changes: &str,
        metadata: Option<Metadata>,
    ) -> Revision {
        let max = self.config.max_revisions;
        let list = self.revisions.entry(item_id.to_string()).or_default();
        let revision = Revision::published(
            item_id,
            next_version(list),
            content.to_string(),
            kind,
            author.to_string(),
            changes.to_string(),
            metadata,
        );
        list.push(revision.clone());

        if list.len() > max {
            let excess = list.len() - max;
            list.drain(..excess);
            tracing::debug!("Evicted {excess} old revision(s) of '{item_id}'");
            if !list.iter().any(|r| r.is_draft) {
                self.autosave.cancel(item_id);
            }
        }

        self.save_to_storage(item_id);
        revision
    }

    /// Appends a draft and, if enabled, schedules its auto-save task.
    ///
    /// An item holds at most one draft: any existing draft is discarded
    /// along with its auto-save task.
    pub fn create_draft(
        &mut self,
        item_id: &str,
        content: &str,
        kind: RevisionKind,
        author: &str,
        metadata: Option<Metadata>,
    ) -> Revision {
        let list = self.revisions.entry(item_id.to_string()).or_default();
        let before = list.len();
        list.retain(|r| !r.is_draft);
        if list.len() != before {
            tracing::debug!("Discarded previous draft of '{item_id}'");
        }

        let draft = Revision::draft(
            item_id,
            next_version(list),
            content.to_string(),
            kind,
            author.to_string(),
            metadata,
        );
        list.push(draft.clone());

        self.autosave.cancel(item_id);
        if self.config.auto_save {
            self.autosave.schedule(
                item_id,
                content.to_string(),
                author.to_string(),
                self.config.save_interval,
                Instant::now(),
            );
        }
        draft
    }

    // ── Draft lifecycle ───────────────────────────────────────────────

    /// Replaces the item's draft with an edited copy.
    ///
    /// `changes` is appended to the draft's summary. Returns `None` if the
    /// item has no draft.
    pub fn update_draft(
        &mut self,
        item_id: &str,
        content: &str,
        changes: &str,
        author: &str,
    ) -> Option<Revision> {
        let slot = self.draft_slot_mut(item_id)?;
        let updated = slot.with_draft_edit(content.to_string(), changes, author.to_string());
        *slot = updated.clone();
        Some(updated)
    }

    /// Turns the item's draft into a published revision.
    ///
    /// The auto-save task is cancelled before this returns. Returns `None`
    /// if the item has no draft.
    pub fn publish_draft(&mut self, item_id: &str, author: &str) -> Option<Revision> {
        let slot = self.draft_slot_mut(item_id)?;
        let published = slot.clone().into_published(author.to_string());
        *slot = published.clone();

        self.autosave.cancel(item_id);
        self.save_to_storage(item_id);
        Some(published)
    }

    /// Discards the item's draft and cancels its auto-save task.
    ///
    /// Returns false if the item has no draft.
    pub fn delete_draft(&mut self, item_id: &str) -> bool {
        let Some(list) = self.revisions.get_mut(item_id) else {
            return false;
        };
        let Some(index) = list.iter().position(|r| r.is_draft) else {
            return false;
        };
        list.remove(index);

        self.autosave.cancel(item_id);
        self.save_to_storage(item_id);
        true
    }

    fn draft_slot_mut(&mut self, item_id: &str) -> Option<&mut Revision> {
        self.revisions
            .get_mut(item_id)?
            .iter_mut()
            .find(|r| r.is_draft)
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// All retained revisions of an item, oldest first.
    pub fn revisions(&self, item_id: &str) -> &[Revision] {
        self.revisions
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn revision(&self, item_id: &str, version: u32) -> Option<&Revision> {
        self.revisions(item_id).iter().find(|r| r.version == version)
    }

    /// The most recently appended revision (last in list order).
    pub fn latest_revision(&self, item_id: &str) -> Option<&Revision> {
        self.revisions(item_id).last()
    }

    /// Every draft in the item's list. Normally zero or one.
    pub fn drafts(&self, item_id: &str) -> Vec<&Revision> {
        self.revisions(item_id).iter().filter(|r| r.is_draft).collect()
    }

    /// Condensed history listing with content previews.
    pub fn history_summary(&self, item_id: &str) -> Vec<RevisionSummary> {
        self.revisions(item_id)
            .iter()
            .map(RevisionSummary::from)
            .collect()
    }

    /// Ids of all items held in memory, sorted.
    pub fn item_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.revisions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Line diff of `version_a` against `version_b`.
    ///
    /// If either version is missing, returns [`RevisionDiff::not_found`].
    pub fn compare_revisions(&self, item_id: &str, version_a: u32, version_b: u32) -> RevisionDiff {
        match (
            self.revision(item_id, version_a),
            self.revision(item_id, version_b),
        ) {
            (Some(a), Some(b)) => RevisionDiff::between(&a.content, &b.content),
            _ => RevisionDiff::not_found(),
        }
    }

    // ── Auto-save ─────────────────────────────────────────────────────

    /// Applies every auto-save tick due at `now`.
    ///
    /// Each tick rewrites the draft with the content captured when the task
    /// was scheduled and mirrors the item to storage. A task whose draft is
    /// gone is cancelled. Returns the number of drafts saved.
    pub fn run_due_autosaves(&mut self, now: Instant) -> usize {
        let mut saved = 0;
        for tick in self.autosave.take_due(now) {
            match self.update_draft(&tick.item_id, &tick.content, AUTO_SAVED, &tick.author) {
                Some(_) => {
                    self.save_to_storage(&tick.item_id);
                    saved += 1;
                }
                None => {
                    self.autosave.cancel(&tick.item_id);
                    tracing::debug!(
                        "Cancelled auto-save for '{}': no draft left",
                        tick.item_id
                    );
                }
            }
        }
        saved
    }

    pub fn has_autosave(&self, item_id: &str) -> bool {
        self.autosave.is_scheduled(item_id)
    }

    /// When the next auto-save tick becomes due, if any task is pending.
    pub fn next_autosave_due(&self) -> Option<Instant> {
        self.autosave.next_due()
    }

    /// Cancels every pending auto-save task.
    pub fn shutdown(&mut self) {
        let cancelled = self.autosave.cancel_all();
        if cancelled > 0 {
            tracing::info!("Cancelled {cancelled} pending draft auto-save(s)");
        }
    }

    // ── Import / export ───────────────────────────────────────────────

    /// Serializes the item's history as a pretty-printed export document.
    ///
    /// Returns an empty string if serialization fails.
    pub fn export_revisions(&self, item_id: &str) -> String {
        match RevisionExport::new(item_id, self.revisions(item_id)).to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to export revisions for '{item_id}': {e:#}");
                String::new()
            }
        }
    }

    /// Replaces the history of the item named in `data`.
    ///
    /// Returns false and leaves the store untouched on malformed input.
    pub fn import_revisions(&mut self, data: &str) -> bool {
        match RevisionExport::parse(data) {
            Ok(export) => {
                tracing::debug!(
                    "Imported {} revision(s) for '{}'",
                    export.revisions.len(),
                    export.item_id
                );
                self.replace_list(export.item_id, export.revisions);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to import revisions: {e:#}");
                false
            }
        }
    }

    // ── Persistence mirror ────────────────────────────────────────────

    /// Writes the item's list to storage.
    ///
    /// Returns false when running in-memory only or when the write fails.
    pub fn save_to_storage(&self, item_id: &str) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        match self.write_item(storage.as_ref(), item_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save revisions for '{item_id}': {e:#}");
                false
            }
        }
    }

    /// Replaces the item's in-memory list with the stored copy.
    ///
    /// Returns false if nothing is stored for the item, or if the stored
    /// value cannot be read or parsed.
    pub fn load_from_storage(&mut self, item_id: &str) -> bool {
        match self.try_load_from_storage(item_id) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Failed to load revisions for '{item_id}': {e:#}");
                false
            }
        }
    }

    /// Like [`RevisionStore::load_from_storage`], but tells a missing entry
    /// (`Ok(false)`) apart from one that cannot be read or parsed (`Err`).
    ///
    /// The in-memory list is left untouched unless the load succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails or the stored value is
    /// not a valid revision list.
    pub fn try_load_from_storage(&mut self, item_id: &str) -> Result<bool> {
        let Some(storage) = self.storage.clone() else {
            return Ok(false);
        };
        let Some(revisions) = read_item(storage.as_ref(), item_id)? else {
            return Ok(false);
        };
        self.replace_list(item_id.to_string(), revisions);
        Ok(true)
    }

    /// Mirrors one item. An empty list removes the stored entry.
    fn write_item(&self, storage: &dyn RevisionStorage, item_id: &str) -> Result<()> {
        let key = storage_key(item_id);
        let revisions = self.revisions(item_id);
        if revisions.is_empty() {
            return storage
                .remove(&key)
                .context("Failed to remove revisions from storage");
        }
        let json = serde_json::to_string(revisions).context("Failed to serialize revisions")?;
        storage
            .write(&key, &json)
            .context("Failed to write revisions to storage")
    }

    /// Installs `revisions` as the item's list, wholesale.
    ///
    /// Drops the auto-save task if the new list carries no draft.
    fn replace_list(&mut self, item_id: String, revisions: Vec<Revision>) {
        if !revisions.iter().any(|r| r.is_draft) {
            self.autosave.cancel(&item_id);
        }
        self.revisions.insert(item_id, revisions);
    }
}

impl Drop for RevisionStore {
    fn drop(&mut self) {
        self.autosave.cancel_all();
    }
}

/// Version for the next appended revision: one past the newest retained.
fn next_version(list: &[Revision]) -> u32 {
    list.last().map_or(1, |r| r.version.saturating_add(1))
}

fn read_item(storage: &dyn RevisionStorage, item_id: &str) -> Result<Option<Vec<Revision>>> {
    let Some(json) = storage
        .read(&storage_key(item_id))
        .context("Failed to read revisions from storage")?
    else {
        return Ok(None);
    };
    let revisions: Vec<Revision> =
        serde_json::from_str(&json).context("Failed to parse stored revisions")?;
    check_history(&revisions).context("Stored revisions are inconsistent")?;
    Ok(Some(revisions))
}
