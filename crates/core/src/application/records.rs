// Typed access to the job store, including the optimistic update loop

use crate::domain::{JobKind, JobRecord};
use crate::error::{AppError, Result};
use crate::port::{JobStore, StoredJob, TimeProvider};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Result of one transform applied during an optimistic update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T> {
    /// Persist the transformed job
    Write(T),
    /// Nothing to change; skip the write
    Keep(T),
}

/// Typed facade over `JobStore`
#[derive(Clone)]
pub struct JobRecords {
    store: Arc<dyn JobStore>,
    time_provider: Arc<dyn TimeProvider>,
    max_update_attempts: usize,
}

impl JobRecords {
    pub fn new(
        store: Arc<dyn JobStore>,
        time_provider: Arc<dyn TimeProvider>,
        max_update_attempts: usize,
    ) -> Self {
        Self {
            store,
            time_provider,
            max_update_attempts: max_update_attempts.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn now(&self) -> i64 {
        self.time_provider.now_millis()
    }

    /// Insert a new job, or return the stored one if its id already exists
    pub async fn create<J: JobRecord>(&self, job: &J) -> Result<J> {
        let stored = StoredJob::from_record(job)?;
        match self.store.insert(&stored).await {
            Ok(()) => Ok(job.clone()),
            Err(AppError::Conflict(_)) => {
                debug!(job_id = %job.id(), kind = %J::KIND, "Job already exists, reusing it");
                self.load(job.id()).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find<J: JobRecord>(&self, id: &str) -> Result<Option<J>> {
        self.store
            .find(J::KIND, id)
            .await?
            .map(StoredJob::into_record)
            .transpose()
    }

    pub async fn load<J: JobRecord>(&self, id: &str) -> Result<J> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", J::KIND, id)))
    }

    /// Load every referenced job; resolves only once all of them are loaded
    pub async fn load_many<J: JobRecord>(&self, ids: &[String]) -> Result<Vec<J>> {
        try_join_all(ids.iter().map(|id| self.load::<J>(id))).await
    }

    pub async fn exists(&self, kind: JobKind, id: &str) -> Result<bool> {
        Ok(self.store.find(kind, id).await?.is_some())
    }

    /// Unconditional full save
    pub async fn save<J: JobRecord>(&self, job: &mut J) -> Result<()> {
        job.meta_mut().updated_at = self.now();
        self.store.save(&StoredJob::from_record(job)?).await?;
        job.meta_mut().version += 1;
        Ok(())
    }

    /// Read, apply `transform`, write back conditioned on the version read
    ///
    /// On a version conflict the job is reloaded and the transform applied
    /// again, up to `max_update_attempts` times. The transform must be a pure
    /// function of the job it is given. Returns the job as last seen together
    /// with the transform's output.
    pub async fn optimistic_update<J, T, F>(&self, id: &str, mut transform: F) -> Result<(J, T)>
    where
        J: JobRecord,
        T: Send,
        F: FnMut(&mut J) -> Result<Transition<T>> + Send,
    {
        for attempt in 1..=self.max_update_attempts {
            let mut job: J = self.load(id).await?;

            let output = match transform(&mut job)? {
                Transition::Keep(output) => return Ok((job, output)),
                Transition::Write(output) => output,
            };

            job.meta_mut().updated_at = self.now();
            if self
                .store
                .update_if_version(&StoredJob::from_record(&job)?)
                .await?
            {
                job.meta_mut().version += 1;
                return Ok((job, output));
            }

            debug!(
                job_id = %id,
                kind = %J::KIND,
                attempt = attempt,
                "Version conflict, reloading"
            );
        }

        Err(AppError::Conflict(format!(
            "{} {}: gave up after {} conflicting updates",
            J::KIND,
            id,
            self.max_update_attempts
        )))
    }
}
