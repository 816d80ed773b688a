//! The persisted application store.
//!
//! Holds the four state slices in memory and mirrors them, as one JSON blob
//! under one key, into a [`KeyValueBackend`]. The blob is read once on open.
//! Writes happen after every mutation (write-through) or on [`PersistedStore::flush`].
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use resume_state_config::AppConfig;
use resume_state_types::{AppState, ArrayField, JobInfo, UserInfo};

use crate::backend::KeyValueBackend;

/// Version of the persisted blob layout.
pub const STATE_FORMAT_VERSION: u32 = 1;

const DEFAULT_KEY: &str = "resume-state";

/// Persisted blob layout.
#[derive(Debug, Deserialize)]
struct StoredState {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    state: AppState,
}

/// Blob being written. A missing `state` is a tombstone left by
/// `clear_persisted`, which reads back as the empty state.
#[derive(Serialize)]
struct StoredStateRef<'a> {
    version: u32,
    revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a AppState>,
}

/// Reads only the revision of a stored blob.
#[derive(Deserialize)]
struct RevisionProbe {
    #[serde(default)]
    revision: u64,
}

/// Revision of a raw blob; unreadable blobs count as 0.
fn revision_of(json: &str) -> u64 {
    serde_json::from_str::<RevisionProbe>(json).map_or(0, |probe| probe.revision)
}

/// Decodes a raw blob into state and revision.
///
/// A missing key yields the empty state. A blob that cannot be parsed is
/// logged and yields the empty state, keeping whatever revision can still
/// be read from it.
fn decode(key: &str, raw: Option<String>) -> (AppState, u64) {
    let Some(json) = raw else {
        return (AppState::default(), 0);
    };
    match serde_json::from_str::<StoredState>(&json) {
        Ok(stored) => {
            if stored.version > STATE_FORMAT_VERSION {
                tracing::warn!(
                    "Stored state {key} has newer format version {}",
                    stored.version
                );
            }
            (stored.state, stored.revision)
        }
        Err(e) => {
            tracing::warn!("Discarding unreadable stored state {key}: {e}");
            (AppState::default(), revision_of(&json))
        }
    }
}

/// Returned when the backend holds a newer revision than this store last saw.
///
/// Another writer saved in between; writing now would silently drop its
/// changes. Recover with `anyhow::Error::downcast_ref::<StaleWriteError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleWriteError {
    pub key: String,
    /// Revision this store last loaded or wrote.
    pub expected: u64,
    /// Revision currently in the backend.
    pub found: u64,
}

impl fmt::Display for StaleWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stale write to {}: store is at revision {} but backend holds {}",
            self.key, self.expected, self.found
        )
    }
}

impl std::error::Error for StaleWriteError {}

/// A failed background write, delivered to error subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    /// Revision the store was at when the write failed.
    pub revision: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Key the blob is stored under.
    pub key: String,
    /// Persist after every mutation.
    pub write_through: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            write_through: true,
        }
    }
}

impl From<&AppConfig> for StoreOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            key: config.storage_key.clone(),
            write_through: config.write_through,
        }
    }
}

/// In-memory application state mirrored into a key-value backend.
pub struct PersistedStore<B: KeyValueBackend> {
    backend: B,
    options: StoreOptions,
    state: AppState,
    /// Revision last loaded from or written to the backend.
    revision: u64,
    /// Whether in-memory state has changed since the last successful write.
    dirty: bool,
    error_subscribers: Vec<Sender<PersistFailure>>,
}

impl<B: KeyValueBackend> fmt::Debug for PersistedStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedStore")
            .field("key", &self.options.key)
            .field("revision", &self.revision)
            .field("dirty", &self.dirty)
            .field("jobs", &self.state.jobs.len())
            .finish()
    }
}

impl<B: KeyValueBackend> PersistedStore<B> {
    /// Opens the store and rehydrates it from the backend.
    ///
    /// A missing key yields the empty state. A blob that cannot be parsed
    /// is logged and replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn open(backend: B, options: StoreOptions) -> Result<Self> {
        let raw = backend
            .get(&options.key)
            .with_context(|| format!("Failed to read stored state: {}", options.key))?;

        let (state, revision) = decode(&options.key, raw);

        tracing::debug!(key = %options.key, revision, "Rehydrated store");
        Ok(Self {
            backend,
            options,
            state,
            revision,
            dirty: false,
            error_subscribers: Vec::new(),
        })
    }

    /// Opens a store on `backend` with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn with_backend(backend: B) -> Result<Self> {
        Self::open(backend, StoreOptions::default())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.state.user_info
    }

    pub fn job_info(&self) -> &JobInfo {
        &self.state.job_info
    }

    pub fn jobs(&self) -> &[JobInfo] {
        &self.state.jobs
    }

    pub fn content(&self) -> &Map<String, Value> {
        &self.state.content
    }

    pub fn key(&self) -> &str {
        &self.options.key
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether there are changes not yet written to the backend.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Registers a channel that receives every failed write-through.
    pub fn subscribe_errors(&mut self) -> Receiver<PersistFailure> {
        let (tx, rx) = mpsc::channel();
        self.error_subscribers.push(tx);
        rx
    }

    /// Replaces the user-info slice wholesale.
    pub fn set_user_info(&mut self, info: UserInfo) {
        self.state.user_info = info;
        self.commit();
    }

    /// Replaces the target job.
    pub fn set_job_info(&mut self, info: JobInfo) {
        self.state.job_info = info;
        self.commit();
    }

    /// Appends a job to the saved list.
    pub fn add_job(&mut self, job: JobInfo) {
        self.state.jobs.push(job);
        self.commit();
    }

    /// Removes the job at `index` and returns it.
    ///
    /// An out-of-bounds index is a silent no-op returning `None`.
    pub fn remove_job(&mut self, index: usize) -> Option<JobInfo> {
        if index >= self.state.jobs.len() {
            tracing::debug!(index, len = self.state.jobs.len(), "remove_job out of bounds");
            return None;
        }
        let job = self.state.jobs.remove(index);
        self.commit();
        Some(job)
    }

    /// Replaces the free-form resume content.
    pub fn set_content(&mut self, data: Map<String, Value>) {
        self.state.content = data;
        self.commit();
    }

    /// Clears all four slices.
    pub fn reset(&mut self) {
        self.state = AppState::default();
        self.commit();
    }

    /// Moves one element of a user-info array from `from` to `to`.
    ///
    /// Returns `false` without mutating or writing if either index is out
    /// of range.
    pub fn reorder(&mut self, field: ArrayField, from: usize, to: usize) -> bool {
        if !self.state.user_info.reorder(field, from, to) {
            return false;
        }
        self.commit();
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

    /// Writes pending changes to the backend.
    ///
    /// No-op if nothing has changed since the last successful write.
    ///
    /// # Errors
    ///
    /// Returns a [`StaleWriteError`] if another writer saved a newer
    /// revision, or the backend error if the write fails. The store stays
    /// dirty on error.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.persist()
    }

    /// Re-reads the backend, adopting its state and revision.
    ///
    /// Unsaved in-memory changes are dropped. An unreadable blob is
    /// handled as on open: logged, and the store becomes empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn reload(&mut self) -> Result<()> {
        let raw = self
            .backend
            .get(&self.options.key)
            .with_context(|| format!("Failed to read stored state: {}", self.options.key))?;
        let (state, revision) = decode(&self.options.key, raw);
        self.state = state;
        self.revision = revision;
        self.dirty = false;
        tracing::debug!(key = %self.options.key, revision, "Reloaded store");
        Ok(())
    }

    /// Replaces the persisted blob with an empty tombstone. In-memory state
    /// is kept.
    ///
    /// The tombstone carries the next revision, so a writer that loaded an
    /// older blob still gets a [`StaleWriteError`].
    ///
    /// # Errors
    ///
    /// Returns a [`StaleWriteError`] if another writer saved a newer
    /// revision, or the backend error if the write fails.
    pub fn clear_persisted(&mut self) -> Result<()> {
        let next = self.revision + 1;
        let json = serde_json::to_string(&StoredStateRef {
            version: STATE_FORMAT_VERSION,
            revision: next,
            state: None,
        })
        .context("Failed to serialize tombstone")?;
        self.swap_blob(&json)?;

        self.revision = next;
        self.dirty = false;
        tracing::debug!(key = %self.options.key, revision = next, "Cleared persisted state");
        Ok(())
    }

    fn commit(&mut self) {
        self.dirty = true;
        if !self.options.write_through {
            return;
        }
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist state {}: {e:#}", self.options.key);
            self.notify_failure(&e);
        }
    }

    fn persist(&mut self) -> Result<()> {
        let next = self.revision + 1;
        let json = serde_json::to_string(&StoredStateRef {
            version: STATE_FORMAT_VERSION,
            revision: next,
            state: Some(&self.state),
        })
        .context("Failed to serialize state")?;
        self.swap_blob(&json)?;

        self.revision = next;
        self.dirty = false;
        tracing::debug!(key = %self.options.key, revision = next, "Persisted state");
        Ok(())
    }

    /// Writes `json` over the stored blob unless another writer got there
    /// first.
    ///
    /// The stored revision must not be newer than ours, and the blob must
    /// still be the one that check read when the write lands.
    fn swap_blob(&self, json: &str) -> Result<()> {
        let key = &self.options.key;
        let current = self
            .backend
            .get(key)
            .with_context(|| format!("Failed to read stored state: {key}"))?;
        let found = current.as_deref().map_or(0, revision_of);
        if found > self.revision {
            return Err(self.stale(found).into());
        }

        let swapped = self
            .backend
            .compare_and_set(key, current.as_deref(), json)
            .with_context(|| format!("Failed to write state: {key}"))?;
        if !swapped {
            let found = self
                .backend
                .get(key)
                .with_context(|| format!("Failed to read stored state: {key}"))?
                .as_deref()
                .map_or(0, revision_of);
            return Err(self.stale(found).into());
        }
        Ok(())
    }

    fn stale(&self, found: u64) -> StaleWriteError {
        StaleWriteError {
            key: self.options.key.clone(),
            expected: self.revision,
            found,
        }
    }

    fn notify_failure(&mut self, error: &anyhow::Error) {
        let failure = PersistFailure {
            revision: self.revision,
            message: format!("{error:#}"),
        };
        self.error_subscribers
            .retain(|tx| tx.send(failure.clone()).is_ok());
    }
}
