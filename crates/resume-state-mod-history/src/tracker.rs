//! Linear undo/redo timeline over `UserInfo` snapshots.
//!
//! Each entry stores the state *before* its changes. Undo hands that
//! snapshot back to the caller; redo hands back the state after the entry,
//! which is the next entry's snapshot or, for the newest entry, the
//! remembered head state.
use std::sync::Arc;

use anyhow::{Context, Result};

use resume_state_types::UserInfo;

use crate::change::{HistoryEntry, Section};
use crate::config::HistoryConfig;
use crate::diff::diff_user_info;
use crate::persistence::{HistoryPersistence, TimelineMeta};

/// Tracks the edit history of one document.
///
/// The timeline is `entries[..position]` (undoable) followed by
/// `entries[position..]` (redoable). Recording while not at the head
/// discards the redoable part first.
pub struct HistoryTracker {
    /// Timeline, ordered by seq ascending (oldest first).
    entries: Vec<HistoryEntry>,
    /// Number of applied entries.
    position: usize,
    /// State after the newest entry.
    head: Option<UserInfo>,
    /// Next sequence number to assign to new entries.
    next_seq: u64,
    /// Document identifier used as the persistence key.
    doc_id: String,
    /// Whether recording is active (set to false during undo/redo replay).
    recording: bool,
    config: HistoryConfig,
    /// Optional disk persistence (None = in-memory only).
    persistence: Option<Arc<HistoryPersistence>>,
    /// Whether in-memory state has changed since the last flush.
    dirty: bool,
}

impl std::fmt::Debug for HistoryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryTracker")
            .field("doc_id", &self.doc_id)
            .field("len", &self.entries.len())
            .field("position", &self.position)
            .field("next_seq", &self.next_seq)
            .field("recording", &self.recording)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl HistoryTracker {
    /// Creates an empty tracker.
    ///
    /// Pass `persistence: None` for in-memory-only mode.
    pub fn new(
        doc_id: String,
        config: HistoryConfig,
        persistence: Option<Arc<HistoryPersistence>>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            head: None,
            next_seq: 0,
            doc_id,
            recording: true,
            config,
            persistence,
            dirty: false,
        }
    }

    /// Creates an in-memory-only tracker with default config.
    pub fn in_memory() -> Self {
        Self::new(String::from("default"), HistoryConfig::default(), None)
    }

    /// Loads an existing timeline from disk, or creates a fresh tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails to read.
    pub fn load_or_new(
        doc_id: String,
        config: HistoryConfig,
        persistence: Option<Arc<HistoryPersistence>>,
    ) -> Result<Self> {
        let mut tracker = Self::new(doc_id, config, persistence);
        let Some(pl) = tracker.persistence.clone() else {
            return Ok(tracker);
        };

        let Some(meta) = pl
            .load_meta(&tracker.doc_id)
            .context("Failed to load timeline metadata")?
        else {
            return Ok(tracker);
        };

        tracker.entries = pl
            .read_entries(&tracker.doc_id)
            .context("Failed to load history from disk")?;
        tracker.head = pl
            .load_head(&tracker.doc_id)
            .context("Failed to load head state")?;
        tracker.next_seq = meta.next_seq;
        tracker.position = usize::try_from(meta.position)
            .unwrap_or(usize::MAX)
            .min(tracker.entries.len());

        tracing::debug!(
            doc_id = %tracker.doc_id,
            entries = tracker.entries.len(),
            position = tracker.position,
            "Loaded history timeline"
        );
        Ok(tracker)
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Records the transition from `before` to `after`.
    ///
    /// Returns the new entry, or `None` when nothing observable changed or
    /// recording is paused. Entries beyond the current position are
    /// discarded before the new one is appended.
    pub fn record(&mut self, before: &UserInfo, after: &UserInfo) -> Option<&HistoryEntry> {
        if !self.recording {
            return None;
        }

        let changes = diff_user_info(before, after);
        if changes.is_empty() {
            return None;
        }

        if self.position < self.entries.len() {
            let discarded = self.entries.len() - self.position;
            self.entries.truncate(self.position);
            tracing::debug!(doc_id = %self.doc_id, discarded, "Branched off history");
        }

        let entry = HistoryEntry::new(self.next_seq, changes, before.clone());
        self.next_seq += 1;
        self.entries.push(entry);
        self.head = Some(after.clone());

        let max = self.config.max_history_depth.max(1);
        if self.entries.len() > max {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
        self.position = self.entries.len();
        self.dirty = true;

        self.entries.last()
    }

    /// Steps back one entry and returns the state to restore.
    ///
    /// Returns `None` if there's nothing to undo.
    pub fn undo(&mut self) -> Option<UserInfo> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.dirty = true;
        Some(self.entries[self.position].snapshot.clone())
    }

    /// Steps forward one entry and returns the state to restore.
    ///
    /// Returns `None` if there's nothing to redo.
    pub fn redo(&mut self) -> Option<UserInfo> {
        if self.position >= self.entries.len() {
            return None;
        }
        let index = self.position;
        self.position += 1;
        self.dirty = true;
        Some(self.state_after(index))
    }

    /// Jumps directly to the state before entry `index`.
    ///
    /// Entries from `index` on become redoable. Returns `None` if `index`
    /// is out of range.
    pub fn jump_to(&mut self, index: usize) -> Option<UserInfo> {
        let snapshot = self.entries.get(index)?.snapshot.clone();
        self.position = index;
        self.dirty = true;
        Some(snapshot)
    }

    fn state_after(&self, index: usize) -> UserInfo {
        if let Some(next) = self.entries.get(index + 1) {
            return next.snapshot.clone();
        }
        match &self.head {
            Some(head) => head.clone(),
            None => self.entries[index].replay(),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    /// All entries, oldest first, including redoable ones.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of applied entries.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with at least one change in `section`.
    pub fn entries_for_section(&self, section: Section) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.touches(section))
    }

    /// Temporarily disables recording (used during undo/redo replay).
    pub fn pause_recording(&mut self) {
        self.recording = false;
    }

    pub fn resume_recording(&mut self) {
        self.recording = true;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Clears all history from memory and disk.
    ///
    /// # Errors
    ///
    /// Returns an error if disk cleanup fails.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.position = 0;
        self.head = None;
        self.next_seq = 0;
        self.dirty = false;

        if let Some(pl) = &self.persistence {
            pl.delete_document(&self.doc_id)
                .context("Failed to clear history from disk")?;
        }
        Ok(())
    }

    /// Writes the timeline to disk.
    ///
    /// No-op if the tracker is in-memory-only or nothing has changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk write fails.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(pl) = &self.persistence {
            let meta = TimelineMeta {
                next_seq: self.next_seq,
                position: self.position as u64,
            };
            pl.write_timeline(&self.doc_id, &self.entries, meta, self.head.as_ref())
                .context("Failed to flush history to disk")?;
            self.dirty = false;
        }
        Ok(())
    }
}
