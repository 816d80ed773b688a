//! Undo/redo history for the personal-information slice.
//!
//! `HistoryTracker` diffs successive `UserInfo` states into field-level
//! changes, keeps a linear timeline of "before" snapshots, and can persist
//! that timeline to an embedded key-value store (redb) so it survives
//! across sessions.
pub mod change;
pub mod config;
pub mod diff;
pub mod persistence;
pub mod tracker;

pub use change::{ChangeKind, HistoryChange, HistoryEntry, Section};
pub use config::HistoryConfig;
pub use diff::{describe, diff_user_info};
pub use persistence::HistoryPersistence;
pub use tracker::HistoryTracker;
