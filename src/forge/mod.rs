pub mod client;

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const FEATURE_TYPE_LISTS: &str = "lists";
pub const FEATURE_TYPE_ISSUES: &str = "issues";
pub const FEATURE_TYPE_SCM: &str = "scm";

/// A capability record attached to a project by the metadata API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Feature {
    pub fn is_list(&self) -> bool {
        self.kind == FEATURE_TYPE_LISTS
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Timestamps arrive as RFC 3339 strings; anything else reads as unset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
