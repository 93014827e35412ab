// BulkComparisonWorker - walks a campaign queue one MultiComparisonJob at a time

use crate::application::factory::MultiComparisonFactory;
use crate::application::records::{JobRecords, Transition};
use crate::domain::{BulkComparisonJob, MultiComparisonJob};
use crate::error::Result;
use crate::port::{AdvanceTask, Dispatcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BulkComparisonWorker {
    records: JobRecords,
    multi_comparisons: MultiComparisonFactory,
    dispatcher: Arc<dyn Dispatcher>,
}

impl BulkComparisonWorker {
    pub fn new(
        records: JobRecords,
        multi_comparisons: MultiComparisonFactory,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            records,
            multi_comparisons,
            dispatcher,
        }
    }

    /// Advance the BulkComparisonJob by one step; never fails
    pub async fn advance(&self, id: &str) {
        if let Err(e) = self.try_advance(id).await {
            warn!(job_id = %id, error = ?e, "BulkComparisonJob advance failed");
        }
    }

    pub async fn try_advance(&self, id: &str) -> Result<()> {
        let job: BulkComparisonJob = self.records.load(id).await?;
        if job.meta.finished {
            debug!(job_id = %id, "BulkComparisonJob already finished");
            return Ok(());
        }

        // Hydrate every started MultiComparisonJob before deciding anything
        let started: Vec<MultiComparisonJob> =
            self.records.load_many(&job.multi_comparisons).await?;

        if let Some(current) = started.last() {
            if !current.meta.finished {
                debug!(job_id = %id, multi_comparison = %current.meta.id, "Campaign step still running");
                return Ok(());
            }
        }

        match job.next_unscheduled(&started) {
            Some(_) => self.start_next(job, &started).await,
            None => self.finish(id).await,
        }
    }

    async fn finish(&self, id: &str) -> Result<()> {
        let (job, finished_now) = self
            .records
            .optimistic_update::<BulkComparisonJob, _, _>(id, |job| {
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
                started = job.multi_comparisons.len(),
                queued = job.comparisons_to_start.len(),
                "BulkComparisonJob finished"
            );
        }
        Ok(())
    }

    /// Create the MultiComparisonJob for the next unscheduled spec, append it, dispatch it
    async fn start_next(&self, job: BulkComparisonJob, started: &[MultiComparisonJob]) -> Result<()> {
        let Some(spec) = job.next_unscheduled(started) else {
            return Ok(());
        };
        let id = job.meta.id.clone();
        let seen = job.multi_comparisons.len();

        let multi = self
            .multi_comparisons
            .create(
                job.next_multi_comparison_id(),
                &job.meta.created_by,
                &spec.url,
                &spec.params,
                spec.runs,
            )
            .await?;
        let multi_id = multi.meta.id;

        let (_, appended) = self
            .records
            .optimistic_update::<BulkComparisonJob, _, _>(&id, |current| {
                if current.meta.finished || current.multi_comparisons.len() != seen {
                    return Ok(Transition::Keep(false));
                }
                current.multi_comparisons.push(multi_id.clone());
                Ok(Transition::Write(true))
            })
            .await?;

        if !appended {
            debug!(job_id = %id, multi_comparison = %multi_id, "MultiComparisonJob already appended");
            return Ok(());
        }

        info!(
            job_id = %id,
            multi_comparison = %multi_id,
            url = %multi.url,
            position = seen + 1,
            "Campaign step started"
        );
        self.dispatcher
            .dispatch(AdvanceTask::MultiComparison(multi_id));
        Ok(())
    }
}
