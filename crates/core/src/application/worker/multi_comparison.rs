// MultiComparisonWorker - runs N comparisons of one URL strictly in sequence

use crate::application::factory::ComparisonFactory;
use crate::application::records::{JobRecords, Transition};
use crate::domain::{ComparisonJob, MultiComparisonJob, TestJob, TestMetrics};
use crate::error::Result;
use crate::port::{AdvanceTask, Dispatcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct MultiComparisonWorker {
    records: JobRecords,
    comparisons: ComparisonFactory,
    dispatcher: Arc<dyn Dispatcher>,
}

impl MultiComparisonWorker {
    pub fn new(
        records: JobRecords,
        comparisons: ComparisonFactory,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            records,
            comparisons,
            dispatcher,
        }
    }

    /// Advance the MultiComparisonJob by one step; never fails
    pub async fn advance(&self, id: &str) {
        if let Err(e) = self.try_advance(id).await {
            warn!(job_id = %id, error = ?e, "MultiComparisonJob advance failed");
        }
    }

    pub async fn try_advance(&self, id: &str) -> Result<()> {
        let job: MultiComparisonJob = self.records.load(id).await?;
        if job.meta.finished {
            debug!(job_id = %id, "MultiComparisonJob already finished");
            return Ok(());
        }

        let last = match job.comparisons.last() {
            Some(last_id) => {
                let last: ComparisonJob = self.records.load(last_id).await?;
                if !last.meta.finished {
                    debug!(job_id = %id, comparison = %last_id, "Waiting for comparison");
                    return Ok(());
                }
                Some(last)
            }
            None => None,
        };

        if job.all_started() {
            return self.finish(id).await;
        }

        // The previous run's baseline informs the next accelerated config
        let prior_result = match last {
            Some(last) => self.records.load::<TestJob>(&last.baseline_test).await?.result,
            None => None,
        };
        self.start_next(job, prior_result).await
    }

    async fn finish(&self, id: &str) -> Result<()> {
        let (job, finished_now) = self
            .records
            .optimistic_update::<MultiComparisonJob, _, _>(id, |job| {
                if job.meta.finished {
                    return Ok(Transition::Keep(false));
                }
                job.meta.finished = true;
                Ok(Transition::Write(true))
            })
            .await?;

        if finished_now {
            info!(job_id = %id, runs = job.runs, "MultiComparisonJob finished");
        }
        Ok(())
    }

    /// Create comparison `k + 1`, append it, then dispatch it
    async fn start_next(
        &self,
        job: MultiComparisonJob,
        prior_result: Option<TestMetrics>,
    ) -> Result<()> {
        let id = job.meta.id.clone();
        let seen = job.comparisons.len();
        let comparison = self
            .comparisons
            .create_with_prior(
                job.next_comparison_id(),
                &job.meta.created_by,
                &job.url,
                &job.params,
                prior_result.as_ref(),
            )
            .await?;
        let comparison_id = comparison.meta.id;

        let (_, appended) = self
            .records
            .optimistic_update::<MultiComparisonJob, _, _>(&id, |current| {
                // Someone else already moved the list on from what we saw
                if current.meta.finished || current.comparisons.len() != seen {
                    return Ok(Transition::Keep(false));
                }
                current.comparisons.push(comparison_id.clone());
                Ok(Transition::Write(true))
            })
            .await?;

        if !appended {
            debug!(job_id = %id, comparison = %comparison_id, "Comparison already appended");
            return Ok(());
        }

        info!(
            job_id = %id,
            comparison = %comparison_id,
            run = seen + 1,
            runs = job.runs,
            "Comparison started"
        );
        self.dispatcher
            .dispatch(AdvanceTask::Comparison(comparison_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::application::fixtures::Harness;
    use crate::domain::{ComparisonJob, JobKind, MultiComparisonJob, RunParams, TestJob};
    use crate::port::testing_service::mocks::MockTestingService;
    use crate::port::AdvanceTask;

    async fn create_multi(h: &Harness, runs: u32) -> String {
        h.pipeline
            .multi_comparison_factory()
            .create("m-1".to_string(), "tester", "https://a.example", &RunParams::default(), runs)
            .await
            .unwrap()
            .meta
            .id
    }

    async fn finish_comparison(h: &Harness, id: &str) {
        let mut comparison: ComparisonJob = h.records().load(id).await.unwrap();
        comparison.meta.finished = true;
        h.records().save(&mut comparison).await.unwrap();
    }

    #[tokio::test]
    async fn test_comparisons_run_in_sequence() {
        let h = Harness::new();
        let id = create_multi(&h, 3).await;
        let worker = h.pipeline.multi_comparison_worker();

        for k in 1..=3 {
            worker.advance(&id).await;
            worker.advance(&id).await;

            let job: MultiComparisonJob = h.records().load(&id).await.unwrap();
            assert_eq!(job.comparisons.len(), k);
            assert_eq!(h.store.count(JobKind::Comparison), k);
            assert_eq!(
                h.dispatcher.drain(),
                vec![AdvanceTask::Comparison(format!("m-1-c{}", k))]
            );
            assert!(!job.meta.finished);

            finish_comparison(&h, &format!("m-1-c{}", k)).await;
        }

        worker.advance(&id).await;
        let job: MultiComparisonJob = h.records().load(&id).await.unwrap();
        assert!(job.meta.finished);
        assert_eq!(job.comparisons.len(), 3);
        assert!(h.dispatcher.drain().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_advance_creates_one_comparison() {
        let h = Harness::new();
        let id = create_multi(&h, 2).await;
        let worker = h.pipeline.multi_comparison_worker();

        tokio::join!(worker.advance(&id), worker.advance(&id));

        let job: MultiComparisonJob = h.records().load(&id).await.unwrap();
        assert_eq!(job.comparisons, vec!["m-1-c1"]);
        assert_eq!(h.store.count(JobKind::Comparison), 1);
        assert_eq!(h.dispatcher.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_append_survives_version_conflicts() {
        let h = Harness::new();
        let id = create_multi(&h, 1).await;
        h.store.inject_conflicts(2);

        h.pipeline.multi_comparison_worker().advance(&id).await;

        let job: MultiComparisonJob = h.records().load(&id).await.unwrap();
        assert_eq!(job.comparisons, vec!["m-1-c1"]);
    }

    #[tokio::test]
    async fn test_next_comparison_sees_previous_baseline() {
        let h = Harness::new();
        let id = create_multi(&h, 2).await;
        let worker = h.pipeline.multi_comparison_worker();

        worker.advance(&id).await;
        assert_eq!(h.generator.contexts()[0].prior_result, None);

        let mut baseline: TestJob = h.records().load("m-1-c1-baseline").await.unwrap();
        baseline.claim(h.records().now()).unwrap();
        baseline.record_submission("wpt-1".to_string()).unwrap();
        baseline.complete(MockTestingService::sample_metrics()).unwrap();
        h.records().save(&mut baseline).await.unwrap();
        finish_comparison(&h, "m-1-c1").await;

        worker.advance(&id).await;
        let contexts = h.generator.contexts();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[1].prior_result, Some(MockTestingService::sample_metrics()));
    }
}
