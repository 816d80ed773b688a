//! Disk persistence layer backed by redb.
//!
//! Uses a single redb database file with three tables:
//! - `history`: JSON-serialized `HistoryEntry` values keyed by `"{doc_id}#{seq:020}"`
//! - `meta`: bincode-serialized `TimelineMeta` keyed by `doc_id`
//! - `head`: JSON-serialized state after the newest entry, keyed by `doc_id`
//!
//! Entries are stored as JSON rather than bincode because snapshots carry
//! open-schema maps that bincode cannot decode.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use resume_state_types::UserInfo;

use crate::change::HistoryEntry;

const HISTORY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("history");

const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const HEAD_TABLE: TableDefinition<&str, &str> = TableDefinition::new("head");

/// Per-document timeline metadata persisted alongside the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimelineMeta {
    /// Next sequence number to assign.
    pub next_seq: u64,
    /// Number of applied entries (the undo pointer).
    pub position: u64,
}

/// Formats a history table key from doc_id and sequence number.
///
/// The sequence number is zero-padded to 20 digits to ensure correct
/// lexicographic ordering in the B-tree.
fn history_key(doc_id: &str, seq: u64) -> String {
    format!("{doc_id}#{seq:020}")
}

/// Returns the exclusive range bounds for all history entries of a document.
///
/// `$` is one ASCII codepoint above the `#` separator.
fn doc_range(doc_id: &str) -> (String, String) {
    (format!("{doc_id}#"), format!("{doc_id}$"))
}

/// Persistence layer for history timelines, shared via `Arc`.
pub struct HistoryPersistence {
    db: Database,
}

impl std::fmt::Debug for HistoryPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryPersistence").finish()
    }
}

impl HistoryPersistence {
    /// Opens or creates `history.redb` in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open(data_dir: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("history.redb");
        let db = Database::create(&db_path)
            .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;

        let write_txn = db
            .begin_write()
            .context("Failed to begin initial write transaction")?;
        {
            let _ = write_txn
                .open_table(HISTORY_TABLE)
                .context("Failed to create history table")?;
            let _ = write_txn
                .open_table(META_TABLE)
                .context("Failed to create meta table")?;
            let _ = write_txn
                .open_table(HEAD_TABLE)
                .context("Failed to create head table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial transaction")?;

        Ok(Arc::new(Self { db }))
    }

    /// Replaces the stored timeline of a document in one transaction.
    ///
    /// Entries on disk that are not in `entries` (branched off or evicted)
    /// are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write transaction fails.
    pub fn write_timeline(
        &self,
        doc_id: &str,
        entries: &[HistoryEntry],
        meta: TimelineMeta,
        head: Option<&UserInfo>,
    ) -> Result<()> {
        let meta_bytes = bincode::serialize(&meta).context("Failed to serialize timeline meta")?;
        let head_json = head
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize head state")?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(HISTORY_TABLE)
                .context("Failed to open history table")?;

            let (start, end) = doc_range(doc_id);
            let stale: Vec<String> = table
                .range::<&str>(start.as_str()..end.as_str())
                .context("Failed to range query history table")?
                .filter_map(|entry| entry.ok().map(|(k, _)| k.value().to_string()))
                .collect();
            for key in &stale {
                table
                    .remove(key.as_str())
                    .context("Failed to remove stale entry")?;
            }

            for entry in entries {
                let key = history_key(doc_id, entry.seq);
                let json = serde_json::to_string(entry).context("Failed to serialize entry")?;
                table
                    .insert(key.as_str(), json.as_str())
                    .context("Failed to insert history entry")?;
            }
        }
        {
            let mut table = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            table
                .insert(doc_id, meta_bytes.as_slice())
                .context("Failed to insert timeline meta")?;
        }
        {
            let mut table = write_txn
                .open_table(HEAD_TABLE)
                .context("Failed to open head table")?;
            match &head_json {
                Some(json) => {
                    table
                        .insert(doc_id, json.as_str())
                        .context("Failed to insert head state")?;
                }
                None => {
                    let _ = table.remove(doc_id);
                }
            }
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")?;
        Ok(())
    }

    /// Reads all entries for a document, ordered by sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction or deserialization fails.
    pub fn read_entries(&self, doc_id: &str) -> Result<Vec<HistoryEntry>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(HISTORY_TABLE)
            .context("Failed to open history table")?;

        let (start, end) = doc_range(doc_id);
        let mut entries = Vec::new();
        for row in table
            .range::<&str>(start.as_str()..end.as_str())
            .context("Failed to range query history table")?
        {
            let (_, value_guard) = row.context("Failed to read history entry")?;
            let entry: HistoryEntry = serde_json::from_str(value_guard.value())
                .context("Failed to deserialize history entry")?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Counts the entries stored for a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction fails.
    pub fn count_entries(&self, doc_id: &str) -> Result<usize> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(HISTORY_TABLE)
            .context("Failed to open history table")?;

        let (start, end) = doc_range(doc_id);
        let count = table
            .range::<&str>(start.as_str()..end.as_str())
            .context("Failed to range query for count")?
            .count();
        Ok(count)
    }

    /// Loads the timeline metadata, or `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction or deserialization fails.
    pub fn load_meta(&self, doc_id: &str) -> Result<Option<TimelineMeta>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(META_TABLE)
            .context("Failed to open meta table")?;

        match table.get(doc_id).context("Failed to read metadata")? {
            Some(guard) => {
                let meta: TimelineMeta = bincode::deserialize(guard.value())
                    .context("Failed to deserialize timeline meta")?;
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// Loads the state after the newest entry, if stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction or deserialization fails.
    pub fn load_head(&self, doc_id: &str) -> Result<Option<UserInfo>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(HEAD_TABLE)
            .context("Failed to open head table")?;

        match table.get(doc_id).context("Failed to read head state")? {
            Some(guard) => {
                let head: UserInfo = serde_json::from_str(guard.value())
                    .context("Failed to deserialize head state")?;
                Ok(Some(head))
            }
            None => Ok(None),
        }
    }

    /// Removes all entries, metadata and head state for a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction fails.
    pub fn delete_document(&self, doc_id: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(HISTORY_TABLE)
                .context("Failed to open history table")?;

            let (start, end) = doc_range(doc_id);
            let keys: Vec<String> = table
                .range::<&str>(start.as_str()..end.as_str())
                .context("Failed to range query for deletion")?
                .filter_map(|entry| entry.ok().map(|(k, _)| k.value().to_string()))
                .collect();
            for key in &keys {
                table
                    .remove(key.as_str())
                    .context("Failed to remove entry")?;
            }
        }
        {
            let mut table = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            let _ = table.remove(doc_id);
        }
        {
            let mut table = write_txn
                .open_table(HEAD_TABLE)
                .context("Failed to open head table")?;
            let _ = table.remove(doc_id);
        }
        write_txn.commit().context("Failed to commit deletion")?;
        Ok(())
    }

    /// Lists all document IDs that have stored metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction fails.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(META_TABLE)
            .context("Failed to open meta table")?;

        let mut doc_ids = Vec::new();
        for entry in table.iter().context("Failed to iterate meta table")? {
            let (key_guard, _) = entry.context("Failed to read meta entry")?;
            doc_ids.push(key_guard.value().to_string());
        }
        Ok(doc_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_user_info;
    use tempfile::TempDir;

    fn named(name: &str) -> UserInfo {
        UserInfo {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn make_entry(seq: u64, from: &str, to: &str) -> HistoryEntry {
        let before = named(from);
        let changes = diff_user_info(&before, &named(to));
        HistoryEntry::new(seq, changes, before)
    }

    fn open_test_db() -> (Arc<HistoryPersistence>, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let pl = HistoryPersistence::open(dir.path()).expect("open db");
        (pl, dir)
    }

    fn meta(next_seq: u64, position: u64) -> TimelineMeta {
        TimelineMeta { next_seq, position }
    }

    #[test]
    fn test_open_creates_database() {
        let (pl, _dir) = open_test_db();
        assert!(pl.list_documents().expect("list").is_empty());
    }

    #[test]
    fn test_write_and_read_timeline() {
        let (pl, _dir) = open_test_db();
        let entries = vec![make_entry(0, "a", "b"), make_entry(1, "b", "c")];
        pl.write_timeline("doc", &entries, meta(2, 2), Some(&named("c")))
            .expect("write");

        let loaded = pl.read_entries("doc").expect("read");
        assert_eq!(loaded, entries);
        assert_eq!(pl.load_meta("doc").expect("meta"), Some(meta(2, 2)));
        assert_eq!(pl.load_head("doc").expect("head"), Some(named("c")));
        assert_eq!(pl.count_entries("doc").expect("count"), 2);
    }

    #[test]
    fn test_rewrite_drops_entries_not_in_timeline() {
        let (pl, _dir) = open_test_db();
        let entries: Vec<HistoryEntry> = (0..5)
            .map(|i| make_entry(i, &format!("v{i}"), &format!("v{}", i + 1)))
            .collect();
        pl.write_timeline("doc", &entries, meta(5, 5), None)
            .expect("write");

        pl.write_timeline("doc", &entries[..2], meta(5, 2), None)
            .expect("rewrite");

        let loaded = pl.read_entries("doc").expect("read");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].seq, 1);
        assert!(pl.load_head("doc").expect("head").is_none());
    }

    #[test]
    fn test_entries_ordered_by_seq_past_ten() {
        let (pl, _dir) = open_test_db();
        let entries: Vec<HistoryEntry> = (0..12)
            .map(|i| make_entry(i, &format!("v{i}"), &format!("v{}", i + 1)))
            .collect();
        pl.write_timeline("doc", &entries, meta(12, 12), None)
            .expect("write");

        let seqs: Vec<u64> = pl
            .read_entries("doc")
            .expect("read")
            .iter()
            .map(|e| e.seq)
            .collect();
        assert_eq!(seqs, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_delete_document() {
        let (pl, _dir) = open_test_db();
        pl.write_timeline("doc", &[make_entry(0, "a", "b")], meta(1, 1), Some(&named("b")))
            .expect("write");

        pl.delete_document("doc").expect("delete");

        assert!(pl.read_entries("doc").expect("read").is_empty());
        assert!(pl.load_meta("doc").expect("meta").is_none());
        assert!(pl.load_head("doc").expect("head").is_none());
    }

    #[test]
    fn test_multi_document_isolation() {
        let (pl, _dir) = open_test_db();
        pl.write_timeline(
            "doc-a",
            &[make_entry(0, "a", "b"), make_entry(1, "b", "c")],
            meta(2, 2),
            None,
        )
        .expect("write a");
        pl.write_timeline("doc-b", &[make_entry(0, "x", "y")], meta(1, 1), None)
            .expect("write b");

        assert_eq!(pl.read_entries("doc-a").expect("read a").len(), 2);
        assert_eq!(pl.read_entries("doc-b").expect("read b").len(), 1);

        pl.delete_document("doc-a").expect("delete a");
        assert!(pl.read_entries("doc-a").expect("read a").is_empty());
        assert_eq!(pl.read_entries("doc-b").expect("read b").len(), 1);

        assert_eq!(pl.list_documents().expect("list"), vec!["doc-b"]);
    }

    #[test]
    fn test_reopen_database_preserves_data() {
        let dir = TempDir::new().expect("create temp dir");
        let entry = make_entry(0, "before", "after");

        {
            let pl = HistoryPersistence::open(dir.path()).expect("open");
            pl.write_timeline("doc", std::slice::from_ref(&entry), meta(1, 1), None)
                .expect("write");
        }

        {
            let pl = HistoryPersistence::open(dir.path()).expect("reopen");
            let entries = pl.read_entries("doc").expect("read");
            assert_eq!(entries, vec![entry]);
            assert_eq!(pl.load_meta("doc").expect("meta"), Some(meta(1, 1)));
        }
    }
}
