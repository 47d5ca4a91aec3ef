// Integration tests for the revision store.
//
// These tests exercise full workflows spanning the RevisionStore and its
// storage surfaces together, simulating how the chat view and the framework
// editor use it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gtm_portal_mod_revisions::{
    RedbStorage, RevisionConfig, RevisionKind, RevisionStorage, RevisionStore,
};

fn test_config(max_revisions: usize) -> RevisionConfig {
    RevisionConfig {
        max_revisions,
        auto_save: true,
        save_interval: Duration::from_secs(30),
    }
}

fn redb_store(dir: &std::path::Path, config: RevisionConfig) -> (RevisionStore, Arc<RedbStorage>) {
    let storage = RedbStorage::open(dir).unwrap();
    let shared: Arc<dyn RevisionStorage> = storage.clone();
    (RevisionStore::new(config, Some(shared)), storage)
}

/// Storage surface whose every call fails.
struct BrokenStorage;

impl RevisionStorage for BrokenStorage {
    fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("disk unplugged")
    }
    fn write(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk unplugged")
    }
    fn remove(&self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk unplugged")
    }
    fn keys(&self) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("disk unplugged")
    }
}

// ── Retention ──────────────────────────────────────────────────────────

#[test]
fn test_revision_count_is_capped_and_versions_increase() {
    for n in [1usize, 5, 12, 40] {
        let mut store = RevisionStore::new(test_config(10), None);
        for i in 0..n {
            store.create_revision("item", &format!("c{i}"), RevisionKind::Document, "a", "e", None);
        }
        let revs = store.revisions("item");
        assert_eq!(revs.len(), n.min(10));
        assert!(revs.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(revs.last().unwrap().content, format!("c{}", n - 1));
    }
}

#[test]
fn test_cap_of_two_keeps_second_and_third() {
    let mut store = RevisionStore::new(test_config(2), None);
    store.create_revision("doc1", "1st", RevisionKind::Document, "a", "e", None);
    store.create_revision("doc1", "2nd", RevisionKind::Document, "a", "e", None);
    store.create_revision("doc1", "3rd", RevisionKind::Document, "a", "e", None);

    let contents: Vec<&str> = store
        .revisions("doc1")
        .iter()
        .map(|r| r.content.as_str())
        .collect();
    assert_eq!(contents, vec!["2nd", "3rd"]);
}

// ── Draft state machine ────────────────────────────────────────────────

#[test]
fn test_single_draft_across_interleavings() {
    let mut store = RevisionStore::in_memory();
    let start = Instant::now();
    let item = "strategy-1";

    for step in 0..40u64 {
        match step % 7 {
            0 | 4 => {
                store.create_draft(item, &format!("d{step}"), RevisionKind::Strategy, "a", None);
            }
            1 | 5 => {
                store.update_draft(item, &format!("u{step}"), "edit", "a");
            }
            2 => {
                store.publish_draft(item, "b");
            }
            3 => {
                store.delete_draft(item);
            }
            _ => {
                store.run_due_autosaves(start + Duration::from_secs(31 * (step + 1)));
            }
        }
        assert!(store.drafts(item).len() <= 1, "step {step}");
        let revs = store.revisions(item);
        assert!(revs.windows(2).all(|w| w[0].version < w[1].version));
    }
}

#[test]
fn test_draft_to_published_workflow() {
    let mut store = RevisionStore::in_memory();
    store.create_revision("deck", "outline", RevisionKind::Project, "alice", "initial", None);
    store.create_draft("deck", "outline\nslide 1", RevisionKind::Project, "alice", None);
    store.update_draft("deck", "outline\nslide 1\nslide 2", "added slides", "alice");
    let published = store.publish_draft("deck", "bob").unwrap();

    assert_eq!(published.version, 2);
    assert_eq!(published.changes, "Draft created; added slides; Published");
    assert!(store.drafts("deck").is_empty());
    assert!(!store.has_autosave("deck"));

    let diff = store.compare_revisions("deck", 1, 2);
    assert_eq!(diff.added, vec!["slide 1", "slide 2"]);
    assert!(diff.removed.is_empty());
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn test_full_workflow_record_reload() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (mut store, _storage) = redb_store(dir.path(), test_config(50));
        for i in 0..5 {
            store.create_revision(
                "chat-42",
                &format!("message {i}"),
                RevisionKind::Conversation,
                "agent",
                "new turn",
                None,
            );
        }
    }

    let (mut store, _storage) = redb_store(dir.path(), test_config(50));
    assert!(store.revisions("chat-42").is_empty());
    assert!(store.load_from_storage("chat-42"));
    assert_eq!(store.revisions("chat-42").len(), 5);
    assert_eq!(store.latest_revision("chat-42").unwrap().content, "message 4");

    // Appending continues the sequence
    let next = store.create_revision("chat-42", "message 5", RevisionKind::Conversation, "agent", "", None);
    assert_eq!(next.version, 6);
}

#[test]
fn test_autosave_recovers_draft_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (mut store, _storage) = redb_store(dir.path(), test_config(50));
        store.create_draft("framework", "DEPA v0", RevisionKind::Strategy, "alice", None);
        let saved = store.run_due_autosaves(Instant::now() + Duration::from_secs(31));
        assert_eq!(saved, 1);
        // Process "crashes": store dropped without publishing
    }

    let (mut store, _storage) = redb_store(dir.path(), test_config(50));
    assert!(store.load_from_storage("framework"));
    let drafts = store.drafts("framework");
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].content, "DEPA v0");
    assert_eq!(drafts[0].changes, "Draft created; Auto-saved");

    // The recovered draft can be published
    assert!(store.publish_draft("framework", "alice").is_some());
}

#[test]
fn test_delete_draft_is_mirrored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, storage) = redb_store(dir.path(), test_config(50));
    store.create_revision("doc", "base", RevisionKind::Document, "a", "init", None);
    store.create_draft("doc", "wip", RevisionKind::Document, "a", None);
    store.run_due_autosaves(Instant::now() + Duration::from_secs(31));
    assert!(store.delete_draft("doc"));

    let raw = storage.read("revisions_doc").unwrap().unwrap();
    assert!(!raw.contains("wip"));
}

#[test]
fn test_storage_is_shared_between_items() {
    let dir = tempfile::tempdir().unwrap();
    let (mut store, storage) = redb_store(dir.path(), test_config(50));
    for i in 0..10 {
        store.create_revision(&format!("doc-{i}"), "x", RevisionKind::Document, "a", "", None);
    }
    assert_eq!(storage.keys().unwrap().len(), 10);
}

#[test]
fn test_broken_storage_keeps_memory_authoritative() {
    let storage: Arc<dyn RevisionStorage> = Arc::new(BrokenStorage);
    let mut store = RevisionStore::new(test_config(50), Some(storage));

    let rev = store.create_revision("doc", "text", RevisionKind::Document, "a", "init", None);
    assert_eq!(rev.version, 1);
    assert!(!store.save_to_storage("doc"));
    assert!(!store.load_from_storage("doc"));
    assert_eq!(store.revisions("doc").len(), 1);

    store.create_draft("doc", "wip", RevisionKind::Document, "a", None);
    assert_eq!(store.run_due_autosaves(Instant::now() + Duration::from_secs(31)), 1);
    assert!(store.publish_draft("doc", "a").is_some());
    assert_eq!(store.revisions("doc").len(), 2);
}

// ── Import / export ────────────────────────────────────────────────────

#[test]
fn test_export_import_into_persistent_store() {
    let mut source = RevisionStore::in_memory();
    let mut meta = serde_json::Map::new();
    meta.insert("market".to_string(), serde_json::json!("UAE"));
    source.create_revision("plan", "q1", RevisionKind::Strategy, "a", "init", Some(meta));
    source.create_revision("plan", "q1\nq2", RevisionKind::Strategy, "a", "add q2", None);
    let exported = source.export_revisions("plan");

    let dir = tempfile::tempdir().unwrap();
    let (mut target, storage) = redb_store(dir.path(), test_config(50));
    assert!(target.import_revisions(&exported));
    assert_eq!(target.revisions("plan"), source.revisions("plan"));

    assert!(target.save_to_storage("plan"));
    assert!(storage.read("revisions_plan").unwrap().is_some());
}

#[test]
fn test_import_of_unknown_kind_fails() {
    let mut store = RevisionStore::in_memory();
    let data = r#"{
        "itemId": "doc",
        "exportedAt": "2025-01-01T00:00:00.000Z",
        "revisions": [{
            "id": "doc-v1", "version": 1, "content": "x", "type": "spreadsheet",
            "author": "a", "timestamp": "2025-01-01T00:00:00.000Z",
            "changes": "", "isDraft": false, "tags": []
        }]
    }"#;
    assert!(!store.import_revisions(data));
    assert!(store.revisions("doc").is_empty());
}
