// ComparisonWorker - starts both tests of a pair and gates completion

use crate::application::records::{JobRecords, Transition};
use crate::domain::{ComparisonJob, TestJob};
use crate::error::Result;
use crate::port::{AdvanceTask, Dispatcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ComparisonWorker {
    records: JobRecords,
    dispatcher: Arc<dyn Dispatcher>,
}

impl ComparisonWorker {
    pub fn new(records: JobRecords, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            records,
            dispatcher,
        }
    }

    /// Advance the ComparisonJob by one step; never fails
    pub async fn advance(&self, id: &str) {
        if let Err(e) = self.try_advance(id).await {
            warn!(job_id = %id, error = ?e, "ComparisonJob advance failed");
        }
    }

    pub async fn try_advance(&self, id: &str) -> Result<()> {
        let job: ComparisonJob = self.records.load(id).await?;
        if job.meta.finished {
            debug!(job_id = %id, "ComparisonJob already finished");
            return Ok(());
        }

        if !job.tests_started {
            return self.start_tests(id).await;
        }

        let tests: Vec<TestJob> = self.records.load_many(&job.test_ids()).await?;
        if !tests.iter().all(|test| test.status.is_terminal()) {
            debug!(job_id = %id, "Waiting for tests");
            return Ok(());
        }

        let (_, finished_now) = self
            .records
            .optimistic_update::<ComparisonJob, _, _>(id, |job| {
                if job.meta.finished {
                    return Ok(Transition::Keep(false));
                }
                job.meta.finished = true;
                Ok(Transition::Write(true))
            })
            .await?;

        if finished_now {
            info!(
                job_id = %id,
                statuses = ?tests.iter().map(|t| t.status).collect::<Vec<_>>(),
                "ComparisonJob finished"
            );
        }
        Ok(())
    }

    /// Flag the pair as started, then hand both tests off without waiting
    async fn start_tests(&self, id: &str) -> Result<()> {
        let (job, started_now) = self
            .records
            .optimistic_update::<ComparisonJob, _, _>(id, |job| {
                if job.tests_started || job.meta.finished {
                    return Ok(Transition::Keep(false));
                }
                job.tests_started = true;
                Ok(Transition::Write(true))
            })
            .await?;

        if !started_now {
            debug!(job_id = %id, "Tests already started");
            return Ok(());
        }

        for test_id in job.test_ids() {
            self.dispatcher.dispatch(AdvanceTask::Test(test_id));
        }
        info!(job_id = %id, url = %job.url, "Comparison tests started");
        Ok(())
    }
}
