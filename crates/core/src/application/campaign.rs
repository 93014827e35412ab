// Campaign Service - entry points for starting and inspecting jobs

use crate::application::pipeline::Pipeline;
use crate::domain::{
    BulkComparisonJob, ComparisonJob, ComparisonSpec, JobId, JobKind, MultiComparisonJob,
    RunParams, TestJob, TestRole,
};
use crate::error::{AppError, Result};
use crate::port::{AdvanceTask, IdProvider, StoredJob};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

fn default_role() -> TestRole {
    TestRole::Baseline
}

fn default_runs() -> u32 {
    1
}

/// Run a single test of one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTestRequest {
    pub created_by: String,
    pub url: String,
    #[serde(default = "default_role")]
    pub role: TestRole,
    #[serde(flatten)]
    pub params: RunParams,
}

/// Run one baseline/accelerated pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartComparisonRequest {
    pub created_by: String,
    pub url: String,
    #[serde(flatten)]
    pub params: RunParams,
}

/// Run `runs` comparisons of one URL in sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMultiComparisonRequest {
    pub created_by: String,
    pub url: String,
    #[serde(default = "default_runs")]
    pub runs: u32,
    #[serde(flatten)]
    pub params: RunParams,
}

/// Run a campaign over many URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBulkComparisonRequest {
    pub created_by: String,
    pub comparisons: Vec<ComparisonSpec>,
}

/// Creates root jobs with fresh ids and hands them to the pipeline
pub struct CampaignService {
    pipeline: Arc<Pipeline>,
    id_provider: Arc<dyn IdProvider>,
}

impl CampaignService {
    pub fn new(pipeline: Arc<Pipeline>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            pipeline,
            id_provider,
        }
    }

    pub async fn start_test(&self, req: StartTestRequest) -> Result<TestJob> {
        validate_creator(&req.created_by)?;
        let job = self
            .pipeline
            .test_factory()
            .create(
                self.id_provider.generate_id(),
                &req.created_by,
                &req.url,
                &req.params,
                req.role,
            )
            .await?;
        info!(job_id = %job.meta.id, role = %job.role, url = %job.url, "Test started");
        self.dispatch(AdvanceTask::Test(job.meta.id.clone()));
        Ok(job)
    }

    pub async fn start_comparison(&self, req: StartComparisonRequest) -> Result<ComparisonJob> {
        validate_creator(&req.created_by)?;
        let job = self
            .pipeline
            .comparison_factory()
            .create(
                self.id_provider.generate_id(),
                &req.created_by,
                &req.url,
                &req.params,
            )
            .await?;
        self.dispatch(AdvanceTask::Comparison(job.meta.id.clone()));
        Ok(job)
    }

    pub async fn start_multi_comparison(
        &self,
        req: StartMultiComparisonRequest,
    ) -> Result<MultiComparisonJob> {
        validate_creator(&req.created_by)?;
        let job = self
            .pipeline
            .multi_comparison_factory()
            .create(
                self.id_provider.generate_id(),
                &req.created_by,
                &req.url,
                &req.params,
                req.runs,
            )
            .await?;
        self.dispatch(AdvanceTask::MultiComparison(job.meta.id.clone()));
        Ok(job)
    }

    pub async fn start_bulk_comparison(
        &self,
        req: StartBulkComparisonRequest,
    ) -> Result<BulkComparisonJob> {
        validate_creator(&req.created_by)?;
        let job = self
            .pipeline
            .bulk_comparison_factory()
            .create(self.id_provider.generate_id(), &req.created_by, req.comparisons)
            .await?;
        self.dispatch(AdvanceTask::BulkComparison(job.meta.id.clone()));
        Ok(job)
    }

    /// Current stored state of a job
    pub async fn job_status(&self, kind: JobKind, id: &str) -> Result<StoredJob> {
        self.pipeline
            .records()
            .store()
            .find(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))
    }

    /// Manually trigger one advance of an existing job
    pub async fn advance(&self, kind: JobKind, id: &str) -> Result<()> {
        if !self.pipeline.records().exists(kind, id).await? {
            return Err(AppError::NotFound(format!("{} {} not found", kind, id)));
        }
        self.dispatch(AdvanceTask::new(kind, id));
        Ok(())
    }

    /// Completion callback from the testing service
    ///
    /// Resolves the TestJob by its testing-service id and advances it.
    pub async fn pingback(&self, external_test_id: &str) -> Result<JobId> {
        let job = self
            .pipeline
            .records()
            .store()
            .find_test_by_external_id(external_test_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No test with testing-service id {}", external_test_id))
            })?;

        debug!(job_id = %job.id, external_test_id = %external_test_id, "Pingback received");
        self.dispatch(AdvanceTask::Test(job.id.clone()));
        Ok(job.id)
    }

    fn dispatch(&self, task: AdvanceTask) {
        self.pipeline.dispatcher().dispatch(task);
    }
}

fn validate_creator(created_by: &str) -> Result<()> {
    if created_by.trim().is_empty() {
        return Err(AppError::Validation("created_by must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::Harness;
    use crate::port::id_provider::mocks::SequentialIdProvider;

    fn service(h: &Harness) -> CampaignService {
        CampaignService::new(h.pipeline.clone(), Arc::new(SequentialIdProvider::new("job")))
    }

    #[tokio::test]
    async fn test_start_bulk_dispatches_first_advance() {
        let h = Harness::new();
        let job = service(&h)
            .start_bulk_comparison(StartBulkComparisonRequest {
                created_by: "alice".to_string(),
                comparisons: vec![ComparisonSpec::new("https://a.example")],
            })
            .await
            .unwrap();

        assert_eq!(job.meta.id, "job-1");
        assert_eq!(
            h.dispatcher.drain(),
            vec![AdvanceTask::BulkComparison("job-1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_validation_errors_create_nothing() {
        let h = Harness::new();
        let svc = service(&h);

        let result = svc
            .start_comparison(StartComparisonRequest {
                created_by: " ".to_string(),
                url: "https://a.example".to_string(),
                params: RunParams::default(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = svc
            .start_multi_comparison(StartMultiComparisonRequest {
                created_by: "alice".to_string(),
                url: "a.example".to_string(),
                runs: 2,
                params: RunParams::default(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Domain(_))));
        assert!(h.dispatcher.drain().is_empty());
    }

    #[tokio::test]
    async fn test_pingback_resolves_external_id() {
        let h = Harness::new();
        let svc = service(&h);
        let job = svc
            .start_test(StartTestRequest {
                created_by: "alice".to_string(),
                url: "https://a.example".to_string(),
                role: TestRole::Accelerated,
                params: RunParams::default(),
            })
            .await
            .unwrap();
        h.run_dispatched().await;

        assert_eq!(svc.pingback("wpt-1").await.unwrap(), job.meta.id);
        assert_eq!(h.dispatcher.drain(), vec![AdvanceTask::Test(job.meta.id)]);
        assert!(matches!(
            svc.pingback("wpt-404").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_and_manual_advance() {
        let h = Harness::new();
        let svc = service(&h);
        let job = svc
            .start_comparison(StartComparisonRequest {
                created_by: "alice".to_string(),
                url: "https://a.example".to_string(),
                params: RunParams::default(),
            })
            .await
            .unwrap();
        h.dispatcher.drain();

        let stored = svc.job_status(JobKind::Comparison, &job.meta.id).await.unwrap();
        assert_eq!(stored.kind, JobKind::Comparison);
        assert!(!stored.finished);
        assert!(svc.job_status(JobKind::Test, &job.meta.id).await.is_err());

        svc.advance(JobKind::Comparison, &job.meta.id).await.unwrap();
        assert_eq!(h.dispatcher.drain().len(), 1);
        assert!(svc.advance(JobKind::BulkComparison, "nope").await.is_err());
    }

    #[test]
    fn test_request_defaults() {
        let req: StartMultiComparisonRequest = serde_json::from_value(serde_json::json!({
            "created_by": "alice",
            "url": "https://a.example",
            "mobile": true
        }))
        .unwrap();
        assert_eq!(req.runs, 1);
        assert!(req.params.mobile);
        assert_eq!(req.params.location, crate::domain::params::DEFAULT_LOCATION);
    }
}
