// Job Store Port (Interface)

use crate::domain::{JobId, JobKind, JobRecord};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// A job as persisted: indexed columns plus the full document
///
/// `version` is authoritative in the store; the copy embedded in `body` is
/// overwritten on load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredJob {
    pub id: JobId,
    pub kind: JobKind,
    pub version: i64,
    pub finished: bool,
    pub external_test_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub body: serde_json::Value,
}

impl StoredJob {
    pub fn from_record<J: JobRecord>(job: &J) -> Result<Self> {
        let meta = job.meta();
        Ok(Self {
            id: meta.id.clone(),
            kind: J::KIND,
            version: meta.version,
            finished: meta.finished,
            external_test_id: job.external_test_id().map(str::to_string),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            body: serde_json::to_value(job)?,
        })
    }

    pub fn into_record<J: JobRecord>(self) -> Result<J> {
        if self.kind != J::KIND {
            return Err(AppError::InvalidState(format!(
                "Job {} is a {}, not a {}",
                self.id,
                self.kind,
                J::KIND
            )));
        }
        let mut job: J = serde_json::from_value(self.body)?;
        job.meta_mut().version = self.version;
        Ok(job)
    }

    /// Document with the store's version patched in
    pub fn document(&self) -> serde_json::Value {
        let mut body = self.body.clone();
        if let Some(meta) = body.get_mut("meta").and_then(|m| m.as_object_mut()) {
            meta.insert("version".to_string(), self.version.into());
        }
        body
    }
}

/// Persistence interface for all four job kinds
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job; `AppError::Conflict` if the id is already taken
    async fn insert(&self, job: &StoredJob) -> Result<()>;

    /// Find job by kind and ID
    async fn find(&self, kind: JobKind, id: &str) -> Result<Option<StoredJob>>;

    /// Unconditional full save; bumps the stored version
    async fn save(&self, job: &StoredJob) -> Result<()>;

    /// Write only if the stored version still equals `job.version`
    ///
    /// Bumps the stored version on success. Returns false on a version
    /// conflict (or if the job no longer exists).
    async fn update_if_version(&self, job: &StoredJob) -> Result<bool>;

    /// All jobs of a kind with `finished == false`, oldest first
    async fn find_unfinished(&self, kind: JobKind) -> Result<Vec<StoredJob>>;

    /// Resolve a testing-service id back to its TestJob
    async fn find_test_by_external_id(&self, external_test_id: &str)
        -> Result<Option<StoredJob>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store with optional injected version conflicts
    #[derive(Default)]
    pub struct InMemoryJobStore {
        jobs: Mutex<HashMap<JobId, StoredJob>>,
        insert_order: Mutex<Vec<JobId>>,
        injected_conflicts: Mutex<usize>,
        conditional_writes: Mutex<usize>,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `n` conditional writes lose against a phantom writer
        pub fn inject_conflicts(&self, n: usize) {
            *self.injected_conflicts.lock().unwrap() = n;
        }

        /// Number of successful conditional writes so far
        pub fn conditional_writes(&self) -> usize {
            *self.conditional_writes.lock().unwrap()
        }

        pub fn count(&self, kind: JobKind) -> usize {
            self.jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.kind == kind)
                .count()
        }

        pub fn get(&self, id: &str) -> Option<StoredJob> {
            self.jobs.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn insert(&self, job: &StoredJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Conflict(format!("Job {} already exists", job.id)));
            }
            jobs.insert(job.id.clone(), job.clone());
            self.insert_order.lock().unwrap().push(job.id.clone());
            Ok(())
        }

        async fn find(&self, kind: JobKind, id: &str) -> Result<Option<StoredJob>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .get(id)
                .filter(|job| job.kind == kind)
                .cloned())
        }

        async fn save(&self, job: &StoredJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            let current = jobs
                .get_mut(&job.id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job.id)))?;
            let version = current.version + 1;
            *current = StoredJob {
                version,
                ..job.clone()
            };
            Ok(())
        }

        async fn update_if_version(&self, job: &StoredJob) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(current) = jobs.get_mut(&job.id) else {
                return Ok(false);
            };

            let mut injected = self.injected_conflicts.lock().unwrap();
            if *injected > 0 {
                *injected -= 1;
                current.version += 1;
                return Ok(false);
            }

            if current.kind != job.kind || current.version != job.version {
                return Ok(false);
            }
            *current = StoredJob {
                version: job.version + 1,
                ..job.clone()
            };
            *self.conditional_writes.lock().unwrap() += 1;
            Ok(true)
        }

        async fn find_unfinished(&self, kind: JobKind) -> Result<Vec<StoredJob>> {
            let jobs = self.jobs.lock().unwrap();
            Ok(self
                .insert_order
                .lock()
                .unwrap()
                .iter()
                .filter_map(|id| jobs.get(id))
                .filter(|job| job.kind == kind && !job.finished)
                .cloned()
                .collect())
        }

        async fn find_test_by_external_id(
            &self,
            external_test_id: &str,
        ) -> Result<Option<StoredJob>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .find(|job| {
                    job.kind == JobKind::Test
                        && job.external_test_id.as_deref() == Some(external_test_id)
                })
                .cloned())
        }
    }
}
