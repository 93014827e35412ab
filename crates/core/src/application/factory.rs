// Factories: build a job value, persist it, return it
//
// Every factory is idempotent per id: if a job with the requested id already
// exists it is returned unchanged and nothing is created.

use crate::application::records::JobRecords;
use crate::domain::params::{validate_runs, validate_url};
use crate::domain::{
    child_id, AccelerationConfig, BulkComparisonJob, ComparisonJob, ComparisonSpec, JobId,
    JobMeta, MultiComparisonJob, RunParams, TestJob, TestMetrics, TestRole,
};
use crate::error::{AppError, Result};
use crate::port::{ConfigGenerator, RunContext};
use std::sync::Arc;
use tracing::{debug, info};

/// Creates single TestJobs, resolving the acceleration config for the accelerated role
#[derive(Clone)]
pub struct TestFactory {
    records: JobRecords,
    config_generator: Arc<dyn ConfigGenerator>,
}

impl TestFactory {
    pub fn new(records: JobRecords, config_generator: Arc<dyn ConfigGenerator>) -> Self {
        Self {
            records,
            config_generator,
        }
    }

    /// User-supplied config if present, otherwise ask the generator
    pub async fn resolve_config(
        &self,
        url: &str,
        params: &RunParams,
        prior_result: Option<&TestMetrics>,
    ) -> Result<AccelerationConfig> {
        if let Some(config) = &params.acceleration_config {
            return Ok(config.clone());
        }
        let context = RunContext {
            mobile: params.mobile,
            prior_result: prior_result.cloned(),
        };
        Ok(self.config_generator.generate(url, &context).await?)
    }

    pub async fn create(
        &self,
        id: JobId,
        created_by: &str,
        url: &str,
        params: &RunParams,
        role: TestRole,
    ) -> Result<TestJob> {
        self.create_with_prior(id, created_by, url, params, role, None)
            .await
    }

    /// Like `create`, with metrics of an earlier run of the URL for the generator
    pub async fn create_with_prior(
        &self,
        id: JobId,
        created_by: &str,
        url: &str,
        params: &RunParams,
        role: TestRole,
        prior_result: Option<&TestMetrics>,
    ) -> Result<TestJob> {
        if let Some(existing) = self.records.find::<TestJob>(&id).await? {
            debug!(job_id = %id, "TestJob already exists");
            return Ok(existing);
        }
        let url = validate_url(url)?;
        params.validate()?;

        let acceleration_config = match role {
            TestRole::Accelerated => Some(self.resolve_config(url, params, prior_result).await?),
            TestRole::Baseline => None,
        };
        let job = TestJob::new(
            JobMeta::new(id, created_by, self.records.now()),
            role,
            url,
            params.clone(),
            acceleration_config,
        );
        self.records.create(&job).await
    }
}

/// Creates a ComparisonJob together with its baseline and accelerated TestJobs
#[derive(Clone)]
pub struct ComparisonFactory {
    records: JobRecords,
    tests: TestFactory,
}

impl ComparisonFactory {
    pub fn new(records: JobRecords, tests: TestFactory) -> Self {
        Self { records, tests }
    }

    pub async fn create(
        &self,
        id: JobId,
        created_by: &str,
        url: &str,
        params: &RunParams,
    ) -> Result<ComparisonJob> {
        self.create_with_prior(id, created_by, url, params, None)
            .await
    }

    pub async fn create_with_prior(
        &self,
        id: JobId,
        created_by: &str,
        url: &str,
        params: &RunParams,
        prior_result: Option<&TestMetrics>,
    ) -> Result<ComparisonJob> {
        if let Some(existing) = self.records.find::<ComparisonJob>(&id).await? {
            debug!(job_id = %id, "ComparisonJob already exists");
            return Ok(existing);
        }
        let url = validate_url(url)?;

        let baseline = self
            .tests
            .create(
                child_id(&id, TestRole::Baseline.label()),
                created_by,
                url,
                params,
                TestRole::Baseline,
            )
            .await?;
        let accelerated = self
            .tests
            .create_with_prior(
                child_id(&id, TestRole::Accelerated.label()),
                created_by,
                url,
                params,
                TestRole::Accelerated,
                prior_result,
            )
            .await?;

        let job = ComparisonJob::new(
            JobMeta::new(id, created_by, self.records.now()),
            url,
            params.clone(),
            baseline.meta.id,
            accelerated.meta.id,
        );
        let job = self.records.create(&job).await?;
        info!(job_id = %job.meta.id, url = %job.url, "ComparisonJob created");
        Ok(job)
    }
}

/// Creates a MultiComparisonJob with an empty comparison list
#[derive(Clone)]
pub struct MultiComparisonFactory {
    records: JobRecords,
}

impl MultiComparisonFactory {
    pub fn new(records: JobRecords) -> Self {
        Self { records }
    }

    pub async fn create(
        &self,
        id: JobId,
        created_by: &str,
        url: &str,
        params: &RunParams,
        runs: u32,
    ) -> Result<MultiComparisonJob> {
        let url = validate_url(url)?;
        validate_runs(runs)?;
        params.validate()?;

        let job = MultiComparisonJob::new(
            JobMeta::new(id, created_by, self.records.now()),
            url,
            params.clone(),
            runs,
        );
        let job = self.records.create(&job).await?;
        info!(job_id = %job.meta.id, url = %job.url, runs = job.runs, "MultiComparisonJob created");
        Ok(job)
    }
}

/// Creates a BulkComparisonJob with its queue populated
#[derive(Clone)]
pub struct BulkComparisonFactory {
    records: JobRecords,
}

impl BulkComparisonFactory {
    pub fn new(records: JobRecords) -> Self {
        Self { records }
    }

    pub async fn create(
        &self,
        id: JobId,
        created_by: &str,
        comparisons_to_start: Vec<ComparisonSpec>,
    ) -> Result<BulkComparisonJob> {
        if comparisons_to_start.is_empty() {
            return Err(AppError::Validation(
                "A bulk comparison needs at least one URL".to_string(),
            ));
        }
        let comparisons_to_start = comparisons_to_start
            .into_iter()
            .map(ComparisonSpec::normalized)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let job = BulkComparisonJob::new(
            JobMeta::new(id, created_by, self.records.now()),
            comparisons_to_start,
        );
        let job = self.records.create(&job).await?;
        info!(
            job_id = %job.meta.id,
            created_by = %job.meta.created_by,
            queued = job.comparisons_to_start.len(),
            "BulkComparisonJob created"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigBuilder, JobKind, TestStatus};
    use crate::port::config_generator::mocks::StaticConfigGenerator;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::time_provider::mocks::ManualClock;

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        generator: Arc<StaticConfigGenerator>,
        records: JobRecords,
        comparisons: ComparisonFactory,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let generator = Arc::new(StaticConfigGenerator::new());
        let records = JobRecords::new(store.clone(), Arc::new(ManualClock::new(1_000)), 5);
        let tests = TestFactory::new(records.clone(), generator.clone());
        Fixture {
            store,
            generator,
            comparisons: ComparisonFactory::new(records.clone(), tests),
            records,
        }
    }

    #[tokio::test]
    async fn test_comparison_factory_creates_pair() {
        let f = fixture();
        let job = f
            .comparisons
            .create("c-1".to_string(), "alice", "https://a.example", &RunParams::default())
            .await
            .unwrap();

        assert_eq!(job.baseline_test, "c-1-baseline");
        assert_eq!(job.accelerated_test, "c-1-accelerated");
        assert!(!job.tests_started);

        let baseline: TestJob = f.records.load(&job.baseline_test).await.unwrap();
        let accelerated: TestJob = f.records.load(&job.accelerated_test).await.unwrap();
        assert_eq!(baseline.status, TestStatus::Pending);
        assert!(baseline.acceleration_config.is_none());
        assert_eq!(accelerated.role, TestRole::Accelerated);
        assert!(accelerated.acceleration_config.is_some());
        assert_eq!(f.generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_comparison_factory_is_idempotent_per_id() {
        let f = fixture();
        let params = RunParams::default();
        f.comparisons
            .create("c-1".to_string(), "alice", "https://a.example", &params)
            .await
            .unwrap();
        f.comparisons
            .create("c-1".to_string(), "alice", "https://a.example", &params)
            .await
            .unwrap();

        assert_eq!(f.store.count(JobKind::Comparison), 1);
        assert_eq!(f.store.count(JobKind::Test), 2);
        assert_eq!(f.generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_user_config_skips_generator() {
        let f = fixture();
        let params = RunParams {
            acceleration_config: Some(ConfigBuilder::new("custom", false).build()),
            ..RunParams::default()
        };
        let job = f
            .comparisons
            .create("c-1".to_string(), "alice", "https://a.example", &params)
            .await
            .unwrap();

        let accelerated: TestJob = f.records.load(&job.accelerated_test).await.unwrap();
        assert_eq!(accelerated.acceleration_config.unwrap().app_name, "custom");
        assert_eq!(f.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let f = fixture();
        let result = f
            .comparisons
            .create("c-1".to_string(), "alice", "ftp://a.example", &RunParams::default())
            .await;
        assert!(matches!(result, Err(AppError::Domain(_))));
        assert_eq!(f.store.count(JobKind::Test), 0);

        let multis = MultiComparisonFactory::new(f.records.clone());
        let result = multis
            .create("m-1".to_string(), "alice", "https://a.example", &RunParams::default(), 0)
            .await;
        assert!(result.is_err());

        let bulks = BulkComparisonFactory::new(f.records.clone());
        let result = bulks.create("b-1".to_string(), "alice", Vec::new()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bulk_factory_populates_queue() {
        let f = fixture();
        let bulks = BulkComparisonFactory::new(f.records.clone());
        let job = bulks
            .create(
                "b-1".to_string(),
                "alice",
                vec![
                    ComparisonSpec::new("https://a.example"),
                    ComparisonSpec::new("https://b.example").with_runs(3),
                ],
            )
            .await
            .unwrap();

        assert_eq!(job.comparisons_to_start.len(), 2);
        assert!(job.multi_comparisons.is_empty());
        assert_eq!(job.meta.created_by, "alice");
    }

    #[tokio::test]
    async fn test_urls_are_stored_trimmed() {
        let f = fixture();
        let comparison = f
            .comparisons
            .create("c-1".to_string(), "alice", " https://a.example\t", &RunParams::default())
            .await
            .unwrap();
        assert_eq!(comparison.url, "https://a.example");
        let baseline: TestJob = f.records.load(&comparison.baseline_test).await.unwrap();
        assert_eq!(baseline.url, "https://a.example");

        let bulk = BulkComparisonFactory::new(f.records.clone())
            .create(
                "b-1".to_string(),
                "alice",
                vec![ComparisonSpec::new("https://b.example  ")],
            )
            .await
            .unwrap();
        assert_eq!(bulk.comparisons_to_start[0].url, "https://b.example");
    }
}
