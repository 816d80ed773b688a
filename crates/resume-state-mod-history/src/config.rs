//! Configuration for the history system.
use std::path::PathBuf;

use resume_state_config::{resolve_data_dir, AppConfig};

/// Maximum number of entries kept per document before the oldest are evicted.
const DEFAULT_MAX_HISTORY_DEPTH: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Max entries per document (memory and disk).
    pub max_history_depth: usize,
    /// Root directory for the history database.
    pub data_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
            data_dir: resolve_data_dir(),
        }
    }
}

impl From<&AppConfig> for HistoryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_history_depth: config.max_history_depth.max(1),
            data_dir: config.effective_data_dir(),
        }
    }
}
