//! Target-job descriptions.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A job description: the one being targeted, or an entry in the saved list.
///
/// An empty value serializes as `{}`; unknown keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobInfo {
    /// Convenience constructor for a job with a title and company.
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            company: Some(company.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
