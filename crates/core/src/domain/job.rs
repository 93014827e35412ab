// Job Domain Model - fields shared by every level of the hierarchy

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Job ID (UUID v4 for top-level jobs, derived from the parent id for children)
pub type JobId = String;

/// The four levels of the comparison hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Test,
    Comparison,
    MultiComparison,
    BulkComparison,
}

impl JobKind {
    /// All kinds, leaves first
    pub const ALL: [JobKind; 4] = [
        JobKind::Test,
        JobKind::Comparison,
        JobKind::MultiComparison,
        JobKind::BulkComparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Test => "TEST",
            JobKind::Comparison => "COMPARISON",
            JobKind::MultiComparison => "MULTI_COMPARISON",
            JobKind::BulkComparison => "BULK_COMPARISON",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TEST" => Ok(JobKind::Test),
            "COMPARISON" => Ok(JobKind::Comparison),
            "MULTI_COMPARISON" => Ok(JobKind::MultiComparison),
            "BULK_COMPARISON" => Ok(JobKind::BulkComparison),
            _ => Err(DomainError::UnknownJobKind(s.to_string())),
        }
    }
}

/// Fields common to all persisted jobs
///
/// `version` is owned by the store: it starts at 0 and increases by one on
/// every successful write. Conditional writes compare against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    pub id: JobId,
    pub created_by: String,
    pub finished: bool,
    pub version: i64,
    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms
}

impl JobMeta {
    /// Create metadata for a fresh, unfinished job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_by` - Identity of the user or system that requested the job
    /// * `now_millis` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(id: impl Into<String>, created_by: impl Into<String>, now_millis: i64) -> Self {
        Self {
            id: id.into(),
            created_by: created_by.into(),
            finished: false,
            version: 0,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }
}

/// A job kind that can be stored as a versioned document
pub trait JobRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: JobKind;

    fn meta(&self) -> &JobMeta;

    fn meta_mut(&mut self) -> &mut JobMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn is_finished(&self) -> bool {
        self.meta().finished
    }

    /// Testing-service id, indexed by the store for pingback lookups
    fn external_test_id(&self) -> Option<&str> {
        None
    }
}

/// Derive a child id from its parent so that repeated creation hits the same record
pub fn child_id(parent: &str, label: &str) -> JobId {
    format!("{}-{}", parent, label)
}
