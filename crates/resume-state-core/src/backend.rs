//! Key-value backends the store persists into.
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

/// String key → string value table.
const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// A get/set/delete store for string values.
///
/// Implementations synchronize internally; all methods take `&self`.
pub trait KeyValueBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Writes `value` only if the stored value still equals `expected`
    /// (`None` meaning the key is absent).
    ///
    /// The comparison and the write happen as one step. Returns `false`
    /// and leaves the key untouched when the stored value differs.
    fn compare_and_set(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool>;
}

/// In-memory backend.
///
/// Clones share the same map, which lets tests model several writers
/// (e.g. two app windows) on one storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    map: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, as if the storage quota were exhausted.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.map.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage quota exceeded writing {key}");
        }
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        map.remove(key);
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage quota exceeded writing {key}");
        }
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        if map.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        map.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

/// On-disk backend: a redb database with a single `kv` table.
pub struct RedbBackend {
    db: Database,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend").finish()
    }
}

impl RedbBackend {
    /// Opens or creates the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let db = Database::create(path)
            .with_context(|| format!("Failed to open state database: {}", path.display()))?;

        let write_txn = db
            .begin_write()
            .context("Failed to begin initial write transaction")?;
        {
            let _ = write_txn
                .open_table(KV_TABLE)
                .context("Failed to create kv table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial transaction")?;

        Ok(Self { db })
    }
}

impl KeyValueBackend for RedbBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(KV_TABLE)
            .context("Failed to open kv table")?;

        match table.get(key).context("Failed to read value")? {
            Some(guard) => Ok(Some(guard.value().to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open kv table")?;
            table.insert(key, value).context("Failed to insert value")?;
        }
        write_txn.commit().context("Failed to commit value")?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open kv table")?;
            table.remove(key).context("Failed to remove value")?;
        }
        write_txn.commit().context("Failed to commit deletion")?;
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        let swapped = {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open kv table")?;
            let current = table
                .get(key)
                .context("Failed to read value")?
                .map(|guard| guard.value().to_string());
            if current.as_deref() == expected {
                table.insert(key, value).context("Failed to insert value")?;
                true
            } else {
                false
            }
        };
        if swapped {
            write_txn.commit().context("Failed to commit value")?;
        } else {
            write_txn.abort().context("Failed to abort write transaction")?;
        }
        Ok(swapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(backend: &dyn KeyValueBackend) {
        assert!(backend.get("k").expect("get").is_none());
        backend.set("k", "v1").expect("set");
        assert_eq!(backend.get("k").expect("get").as_deref(), Some("v1"));
        backend.set("k", "v2").expect("overwrite");
        assert_eq!(backend.get("k").expect("get").as_deref(), Some("v2"));
        backend.delete("k").expect("delete");
        assert!(backend.get("k").expect("get").is_none());
        backend.delete("missing").expect("delete missing");

        assert!(backend.compare_and_set("c", None, "a").expect("cas"));
        assert!(!backend.compare_and_set("c", None, "b").expect("cas"));
        assert!(!backend.compare_and_set("c", Some("x"), "b").expect("cas"));
        assert!(backend.compare_and_set("c", Some("a"), "b").expect("cas"));
        assert_eq!(backend.get("c").expect("get").as_deref(), Some("b"));
    }

    #[test]
    fn test_memory_backend_crud() {
        exercise(&MemoryBackend::new());
    }

    #[test]
    fn test_redb_backend_crud() {
        let dir = TempDir::new().expect("temp dir");
        let backend = RedbBackend::open(&dir.path().join("state.redb")).expect("open");
        exercise(&backend);
    }

    #[test]
    fn test_memory_backend_clones_share_storage() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.set("key", "value").expect("set");
        assert_eq!(b.get("key").expect("get").as_deref(), Some("value"));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_memory_backend_fail_writes() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let err = backend.set("k", "v").unwrap_err();
        assert!(err.to_string().contains("quota"));
        assert!(backend.compare_and_set("k", None, "v").is_err());
        backend.set_fail_writes(false);
        backend.set("k", "v").expect("set");
    }

    #[test]
    fn test_redb_backend_survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("state.redb");
        {
            let backend = RedbBackend::open(&path).expect("open");
            backend.set("resume", "{\"a\":1}").expect("set");
        }
        let backend = RedbBackend::open(&path).expect("reopen");
        assert_eq!(
            backend.get("resume").expect("get").as_deref(),
            Some("{\"a\":1}")
        );
    }
}
