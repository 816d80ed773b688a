//! A `ResumeSession` ties together the persisted store and the undo/redo
//! history of its personal-information slice.
//!
//! Edits to `UserInfo` go through the session so the tracker sees the
//! before and after state. Undo/redo write the restored snapshot back
//! through the same path with recording paused. Jobs and content are not
//! tracked.
use anyhow::{Context, Result};
use serde_json::{Map, Value};

use resume_state_config::AppConfig;
use resume_state_types::{ArrayField, JobInfo, UserInfo};

use crate::backend::{KeyValueBackend, RedbBackend};
use crate::history::{HistoryConfig, HistoryEntry, HistoryPersistence, HistoryTracker};
use crate::store::{PersistedStore, StoreOptions};

/// File name of the state database inside the data directory.
const STATE_DB_FILE: &str = "state.redb";

pub struct ResumeSession<B: KeyValueBackend> {
    store: PersistedStore<B>,
    history: HistoryTracker,
}

impl<B: KeyValueBackend> std::fmt::Debug for ResumeSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeSession")
            .field("store", &self.store)
            .field("history", &self.history)
            .finish()
    }
}

impl<B: KeyValueBackend> ResumeSession<B> {
    pub fn new(store: PersistedStore<B>, history: HistoryTracker) -> Self {
        Self { store, history }
    }

    /// Opens a store on `backend` with in-memory history.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn in_memory(backend: B, options: StoreOptions) -> Result<Self> {
        let history = HistoryTracker::new(options.key.clone(), HistoryConfig::default(), None);
        let store = PersistedStore::open(backend, options)?;
        Ok(Self::new(store, history))
    }

    pub fn store(&self) -> &PersistedStore<B> {
        &self.store
    }

    /// Direct store access. Edits made here bypass history.
    pub fn store_mut(&mut self) -> &mut PersistedStore<B> {
        &mut self.store
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn user_info(&self) -> &UserInfo {
        self.store.user_info()
    }

    /// Replaces the user info, recording the difference.
    ///
    /// Returns the new history entry, or `None` for a no-op edit.
    pub fn set_user_info(&mut self, info: UserInfo) -> Option<&HistoryEntry> {
        let before = self.store.user_info().clone();
        self.store.set_user_info(info);
        self.history.record(&before, self.store.user_info())
    }

    /// Edits the user info in place, recording the difference.
    pub fn update_user_info<F>(&mut self, edit: F) -> Option<&HistoryEntry>
    where
        F: FnOnce(&mut UserInfo),
    {
        let mut info = self.store.user_info().clone();
        edit(&mut info);
        self.set_user_info(info)
    }

    /// Moves one array element, recording the reorder.
    ///
    /// Returns `false` if either index is out of range.
    pub fn reorder(&mut self, field: ArrayField, from: usize, to: usize) -> bool {
        let before = self.store.user_info().clone();
        if !self.store.reorder(field, from, to) {
            return false;
        }
        self.history.record(&before, self.store.user_info());
        true
    }

    pub fn reorder_experiences(&mut self, from: usize, to: usize) -> bool {
        self.reorder(ArrayField::Experiences, from, to)
    }

    pub fn reorder_education(&mut self, from: usize, to: usize) -> bool {
        self.reorder(ArrayField::Education, from, to)
    }

    pub fn reorder_skills(&mut self, from: usize, to: usize) -> bool {
        self.reorder(ArrayField::Skills, from, to)
    }

    pub fn reorder_certifications(&mut self, from: usize, to: usize) -> bool {
        self.reorder(ArrayField::Certifications, from, to)
    }

    pub fn reorder_links(&mut self, from: usize, to: usize) -> bool {
        self.reorder(ArrayField::Links, from, to)
    }

    /// Performs undo. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Performs redo. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    /// Restores the state before history entry `index`.
    pub fn jump_to(&mut self, index: usize) -> bool {
        match self.history.jump_to(index) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Writes a state handed back by the history without recording it.
    fn restore(&mut self, state: UserInfo) {
        self.history.pause_recording();
        self.set_user_info(state);
        self.history.resume_recording();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drops all history, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if disk cleanup fails.
    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    pub fn set_job_info(&mut self, info: JobInfo) {
        self.store.set_job_info(info);
    }

    pub fn add_job(&mut self, job: JobInfo) {
        self.store.add_job(job);
    }

    pub fn remove_job(&mut self, index: usize) -> Option<JobInfo> {
        self.store.remove_job(index)
    }

    pub fn set_content(&mut self, data: Map<String, Value>) {
        self.store.set_content(data);
    }

    /// Clears all slices. The user-info part is recorded, so it can be undone.
    pub fn reset(&mut self) -> Option<&HistoryEntry> {
        let before = self.store.user_info().clone();
        self.store.reset();
        self.history.record(&before, self.store.user_info())
    }

    /// Flushes the store and then the history.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the history is still flushed when the
    /// store write fails.
    pub fn flush(&mut self) -> Result<()> {
        let store_result = self.store.flush().context("Failed to flush store");
        let history_result = self.history.flush().context("Failed to flush history");
        store_result.and(history_result)
    }
}

impl ResumeSession<RedbBackend> {
    /// Opens the on-disk store and history under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either database cannot be opened or read.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let data_dir = config.effective_data_dir();
        let backend = RedbBackend::open(&data_dir.join(STATE_DB_FILE))?;
        let options = StoreOptions::from(config);
        let doc_id = options.key.clone();
        let store = PersistedStore::open(backend, options)?;

        let history_config = HistoryConfig::from(config);
        let persistence = if config.persist_history {
            Some(HistoryPersistence::open(&data_dir)?)
        } else {
            None
        };
        let history = HistoryTracker::load_or_new(doc_id, history_config, persistence)
            .context("Failed to load history")?;

        tracing::debug!(data_dir = %data_dir.display(), "Opened resume session");
        Ok(Self::new(store, history))
    }
}
