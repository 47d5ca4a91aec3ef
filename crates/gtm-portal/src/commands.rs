/// Subcommand implementations. Output goes to the given writer.
use std::io::Write;

use anyhow::{bail, Context, Result};
use gtm_portal_mod_revisions::config::item_id_from_key;
use gtm_portal_mod_revisions::timestamp::to_iso;
use gtm_portal_mod_revisions::{RevisionExport, RevisionKind, RevisionStorage, RevisionStore};

/// Lists every item id with a stored revision list.
pub fn items(storage: &dyn RevisionStorage, out: &mut impl Write) -> Result<()> {
    let keys = storage.keys().context("Failed to list stored items")?;
    for item_id in keys.iter().filter_map(|k| item_id_from_key(k)) {
        writeln!(out, "{item_id}")?;
    }
    Ok(())
}

pub fn history(store: &mut RevisionStore, item: &str, out: &mut impl Write) -> Result<()> {
    load(store, item)?;
    for entry in store.history_summary(item) {
        let draft = if entry.is_draft { " [draft]" } else { "" };
        writeln!(
            out,
            "v{}{draft}  {}  {}: {}",
            entry.version,
            to_iso(&entry.timestamp),
            entry.author,
            entry.changes
        )?;
        writeln!(out, "    {}", entry.content_preview.replace('\n', " "))?;
    }
    Ok(())
}

pub fn show(store: &mut RevisionStore, item: &str, version: u32, out: &mut impl Write) -> Result<()> {
    load(store, item)?;
    let Some(revision) = store.revision(item, version) else {
        bail!("Revision {version} of '{item}' not found");
    };
    writeln!(out, "{}", revision.content)?;
    Ok(())
}

pub fn diff(store: &mut RevisionStore, item: &str, a: u32, b: u32, out: &mut impl Write) -> Result<()> {
    load(store, item)?;
    let diff = store.compare_revisions(item, a, b);
    if !diff.found {
        bail!("Cannot compare v{a} and v{b} of '{item}': version not found");
    }
    for line in &diff.added {
        writeln!(out, "+ {line}")?;
    }
    for line in &diff.removed {
        writeln!(out, "- {line}")?;
    }
    Ok(())
}

pub fn record(
    store: &mut RevisionStore,
    item: &str,
    content: &str,
    kind: RevisionKind,
    author: &str,
    changes: &str,
    out: &mut impl Write,
) -> Result<()> {
    // A missing item starts a new history; an unreadable one is never overwritten
    store
        .try_load_from_storage(item)
        .with_context(|| format!("Refusing to record over unreadable history of '{item}'"))?;
    let revision = store.create_revision(item, content, kind, author, changes, None);
    writeln!(out, "Recorded {} (v{})", revision.id, revision.version)?;
    Ok(())
}

pub fn export(store: &mut RevisionStore, item: &str, out: &mut impl Write) -> Result<()> {
    load(store, item)?;
    let json = store.export_revisions(item);
    if json.is_empty() {
        bail!("Failed to export '{item}'");
    }
    writeln!(out, "{json}")?;
    Ok(())
}

pub fn import(store: &mut RevisionStore, data: &str, out: &mut impl Write) -> Result<()> {
    let export = RevisionExport::parse(data)?;
    if !store.import_revisions(data) {
        bail!("Failed to import revisions for '{}'", export.item_id);
    }
    if !store.save_to_storage(&export.item_id) {
        bail!("Imported '{}' but could not store it", export.item_id);
    }
    writeln!(
        out,
        "Imported {} revision(s) for '{}'",
        export.revisions.len(),
        export.item_id
    )?;
    Ok(())
}

/// Loads the item's stored history, failing if there is none.
fn load(store: &mut RevisionStore, item: &str) -> Result<()> {
    let loaded = store
        .try_load_from_storage(item)
        .with_context(|| format!("Failed to load history of '{item}'"))?;
    if !loaded {
        bail!("No stored history for '{item}'");
    }
    Ok(())
}
