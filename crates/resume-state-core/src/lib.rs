//! Persisted application store and the history-aware session on top of it.
pub mod backend;
pub mod history;
pub mod session;
pub mod store;

pub use backend::{KeyValueBackend, MemoryBackend, RedbBackend};
pub use session::ResumeSession;
pub use store::{PersistFailure, PersistedStore, StaleWriteError, StoreOptions};

pub use resume_state_types::{
    ArrayField, AppState, Certification, Education, Experience, JobInfo, Link, ScalarField,
    Skill, UserInfo,
};
