/// Key-value storage surfaces mirroring the revision store.
///
/// Values are JSON text keyed by `"revisions_{item_id}"`. Two backends:
/// - [`MemoryStorage`]: process-local map, used in tests and demos
/// - [`RedbStorage`]: a single redb file with one `&str -> &str` table
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

/// Revisions table: storage key → JSON array of revisions.
const REVISIONS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("revisions");

/// A key-value text store the revision store mirrors into.
///
/// Shared between stores and tools via `Arc<dyn RevisionStorage>`.
pub trait RevisionStorage: Send + Sync {
    /// Returns the value at `key`, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` at `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Lists all stored keys.
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-process storage surface.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Memory storage lock poisoned"))
    }
}

impl RevisionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Storage surface backed by redb.
///
/// Thread-safe: redb supports concurrent readers and serialized writers.
pub struct RedbStorage {
    db: Database,
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage").finish()
    }
}

impl RedbStorage {
    /// Opens or creates `revisions.redb` in the given directory.
    ///
    /// Creates the directory and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open(data_dir: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("revisions.redb");
        let db = Database::create(&db_path)
            .with_context(|| format!("Failed to open revision database: {}", db_path.display()))?;

        // Ensure the table exists
        let write_txn = db
            .begin_write()
            .context("Failed to begin initial write transaction")?;
        {
            let _ = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to create revisions table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial transaction")?;

        Ok(Arc::new(Self { db }))
    }
}

impl RevisionStorage for RedbStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(REVISIONS_TABLE)
            .context("Failed to open revisions table")?;

        let value = table
            .get(key)
            .context("Failed to read revisions entry")?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to open revisions table")?;
            table
                .insert(key, value)
                .context("Failed to insert revisions entry")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to open revisions table")?;
            let _ = table
                .remove(key)
                .context("Failed to remove revisions entry")?;
        }
        write_txn.commit().context("Failed to commit removal")?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(REVISIONS_TABLE)
            .context("Failed to open revisions table")?;

        let mut keys = Vec::new();
        for entry in table.iter().context("Failed to iterate revisions table")? {
            let (key_guard, _) = entry.context("Failed to read revisions entry")?;
            keys.push(key_guard.value().to_string());
        }
        Ok(keys)
    }
}
