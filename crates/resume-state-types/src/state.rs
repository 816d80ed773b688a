//! The complete application state, as persisted.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::job::JobInfo;
use crate::user::UserInfo;

/// All four top-level slices of the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub user_info: UserInfo,
    pub job_info: JobInfo,
    pub jobs: Vec<JobInfo>,
    /// Free-form resume content produced by the editor.
    pub content: Map<String, Value>,
}

impl AppState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
