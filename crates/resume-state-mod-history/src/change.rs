//! Core types for history changes and entries.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use resume_state_types::{ArrayField, ScalarField, UserInfo};

/// Category a change is grouped under for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Personal,
    Experience,
    Education,
    Skills,
    Certifications,
    Links,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Personal => "Personal",
            Section::Experience => "Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Certifications => "Certifications",
            Section::Links => "Links",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "personal" => Ok(Section::Personal),
            "experience" => Ok(Section::Experience),
            "education" => Ok(Section::Education),
            "skills" => Ok(Section::Skills),
            "certifications" => Ok(Section::Certifications),
            "links" => Ok(Section::Links),
            _ => Err(anyhow::anyhow!("unknown section: {s}")),
        }
    }
}

impl From<ArrayField> for Section {
    fn from(field: ArrayField) -> Self {
        match field {
            ArrayField::Experiences => Section::Experience,
            ArrayField::Education => Section::Education,
            ArrayField::Skills => Section::Skills,
            ArrayField::Certifications => Section::Certifications,
            ArrayField::Links => Section::Links,
        }
    }
}

/// What a change did to its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A scalar field changed value. Values are the strings (or null).
    Modified,
    /// An array grew. Values are the old and new lengths only.
    Added,
    /// An array shrank. Values are the old and new lengths only.
    Removed,
    /// An array kept its length but changed content. Values are the full arrays.
    Updated,
}

/// A single field-level difference between two `UserInfo` states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChange {
    /// Serialized key of the field (`name`, `customUrl`, `experiences`, ...).
    pub field: String,
    /// Human-readable label.
    pub label: String,
    pub kind: ChangeKind,
    pub old_value: Value,
    pub new_value: Value,
    pub section: Section,
}

/// One undo step.
///
/// `snapshot` is the full state *before* `changes` were applied, so undo
/// restores it directly instead of inverting diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Monotonic sequence number, used as the persistence key.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub changes: Vec<HistoryChange>,
    pub snapshot: UserInfo,
}

impl HistoryEntry {
    /// Creates an entry stamped with a fresh id and the current time.
    pub fn new(seq: u64, changes: Vec<HistoryChange>, snapshot: UserInfo) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            timestamp: Utc::now(),
            description: crate::diff::describe(&changes),
            changes,
            snapshot,
        }
    }

    /// Whether any change in this entry belongs to `section`.
    pub fn touches(&self, section: Section) -> bool {
        self.changes.iter().any(|c| c.section == section)
    }

    /// Rebuilds the post-change state by applying `changes` to `snapshot`.
    ///
    /// Scalar and `Updated` array changes are exact. `Added` and `Removed`
    /// changes only carry lengths and are skipped.
    pub fn replay(&self) -> UserInfo {
        let mut state = self.snapshot.clone();
        for change in &self.changes {
            match change.kind {
                ChangeKind::Modified => {
                    let Some(field) = ScalarField::from_key(&change.field) else {
                        tracing::warn!("Unknown scalar field in history: {}", change.field);
                        continue;
                    };
                    state.set_scalar(field, change.new_value.as_str().map(str::to_string));
                }
                ChangeKind::Updated => {
                    let Some(field) = ArrayField::from_key(&change.field) else {
                        tracing::warn!("Unknown array field in history: {}", change.field);
                        continue;
                    };
                    if let Err(e) = state.set_array_value(field, change.new_value.clone()) {
                        tracing::warn!("Failed to replay {} change: {e}", change.field);
                    }
                }
                ChangeKind::Added | ChangeKind::Removed => {
                    tracing::debug!(
                        field = %change.field,
                        "Length-only change cannot be replayed"
                    );
                }
            }
        }
        state
    }
}
