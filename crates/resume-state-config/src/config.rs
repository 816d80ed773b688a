//! Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RESUME_STATE_DATA_DIR";

/// Default key under which the whole application state is stored.
const DEFAULT_STORAGE_KEY: &str = "resume-state";

/// Default maximum number of history entries kept per document.
const DEFAULT_MAX_HISTORY_DEPTH: usize = 100;

/// Upper bound for `max_history_depth`. Every entry holds a full snapshot.
const MAX_HISTORY_DEPTH_LIMIT: usize = 10_000;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the state and history databases. Empty = resolved default.
    pub data_dir: String,
    /// Key the serialized state blob is stored under.
    pub storage_key: String,
    /// Persist after every mutation instead of waiting for an explicit flush.
    pub write_through: bool,
    /// Keep undo/redo history on disk across sessions.
    pub persist_history: bool,
    /// Maximum number of history entries; oldest are evicted first.
    pub max_history_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            write_through: true,
            persist_history: true,
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
        }
    }
}

impl AppConfig {
    /// Returns the config file path: exe directory + `resume-state.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("resume-state.json")))
            .unwrap_or_else(|| PathBuf::from("resume-state.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Broken file stays on disk untouched
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Clamps values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.max_history_depth = self.max_history_depth.clamp(1, MAX_HISTORY_DEPTH_LIMIT);
        let trimmed = self.storage_key.trim();
        if trimmed.is_empty() {
            self.storage_key = DEFAULT_STORAGE_KEY.to_string();
        } else if trimmed.len() != self.storage_key.len() {
            self.storage_key = trimmed.to_string();
        }
        self.data_dir = self.data_dir.trim().to_string();
    }

    /// Returns the effective data directory for this configuration.
    pub fn effective_data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            resolve_data_dir()
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}

/// Resolves the default data directory.
///
/// Resolution order:
/// 1. `RESUME_STATE_DATA_DIR` environment variable
/// 2. Platform data directory + `resume-state`
/// 3. `.data/` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("resume-state"))
        .unwrap_or_else(|| PathBuf::from(".data"))
}
