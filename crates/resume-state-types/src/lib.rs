//! Shared data model for the resume state workspace.
//!
//! Everything here is plain serde data: the persisted store, the history
//! tracker, and the CLI all agree on these shapes.
pub mod field;
pub mod job;
pub mod state;
pub mod user;

pub use field::{move_item, ArrayField, ScalarField};
pub use job::JobInfo;
pub use state::AppState;
pub use user::{Certification, Education, Experience, Link, Skill, UserInfo};
