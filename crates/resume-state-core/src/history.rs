// Re-exports from resume-state-mod-history.
pub use resume_state_mod_history::{
    ChangeKind, HistoryChange, HistoryConfig, HistoryEntry, HistoryPersistence, HistoryTracker,
    Section,
};
