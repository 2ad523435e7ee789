//! Declarative resource model for the control plane.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Namespaced object identity used as the reconcile key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Assigned on creation; manifests never carry one.
    #[serde(default = "Uuid::new_v4")]
    pub uid: Uuid,
    /// Bumped by the store on every spec change.
    #[serde(default = "initial_generation")]
    pub generation: i64,
    #[serde(default)]
    pub finalizers: Vec<String>,
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

fn initial_generation() -> i64 {
    1
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: Uuid::new_v4(),
            generation: 1,
            finalizers: Vec::new(),
            deletion_timestamp: None,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Desired state for one remote source registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    Added,
    Updated,
    Deleted,
    Failed,
}

/// Immutable status record appended by a reconciler. The most recent
/// condition is the authoritative observed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_update_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            status: true,
            reason: None,
            message: None,
            last_update_time: Utc::now(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            condition_type: ConditionType::Failed,
            status: false,
            reason: Some(reason.into()),
            message: None,
            last_update_time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedStatus {
    /// Append-only; observably monotonic per key.
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub metadata: ObjectMeta,
    pub spec: FeedSpec,
    #[serde(default)]
    pub status: FeedStatus,
}

impl Feed {
    pub fn new(namespace: &str, name: &str, link: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: FeedSpec {
                name: name.to_string(),
                link: link.to_string(),
            },
            status: FeedStatus::default(),
        }
    }

    pub fn last_condition(&self) -> Option<&Condition> {
        self.status.conditions.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryConfig {
    pub titles_count: usize,
}

/// Desired state for one recomputed projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotNewsSpec {
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<NaiveDate>,
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub feed_groups: Vec<String>,
    pub summary_config: SummaryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotNewsStatus {
    pub news_link: String,
    pub articles_titles: Vec<String>,
    pub articles_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotNews {
    pub metadata: ObjectMeta,
    pub spec: HotNewsSpec,
    #[serde(default)]
    pub status: HotNewsStatus,
}

/// Named sets of sources usable as shortcuts in a HotNews spec, e.g.
/// `world -> "bbc-world,abc-news"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedGroups {
    pub metadata: ObjectMeta,
    pub data: HashMap<String, String>,
}

/// A single admission failure, scoped to the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub detail: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.detail)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("admission rejected: {}", format_field_errors(.0))]
    AdmissionRejected(Vec<FieldError>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("registry returned {status}: {detail}")]
    Registry { status: u16, detail: String },

    #[error("transient: {0}")]
    Transient(String),

    #[error("manifest I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl OperatorError {
    /// Transient errors retain the current condition and are requeued
    /// by the outer loop; permanent ones write `Failed` and wait for
    /// a spec change.
    pub fn is_transient(&self) -> bool {
        match self {
            OperatorError::Transient(_) | OperatorError::Http(_) => true,
            // 404 is treated as transient: the registry may simply not
            // have converged yet.
            OperatorError::Registry { status, .. } => *status == 404 || *status >= 500,
            _ => false,
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, OperatorError>;
