// Pipeline - explicit wiring of workers and factories against one store

use crate::application::config::PipelineConfig;
use crate::application::factory::{
    BulkComparisonFactory, ComparisonFactory, MultiComparisonFactory, TestFactory,
};
use crate::application::records::JobRecords;
use crate::application::retry::RetryPolicy;
use crate::application::worker::{
    BulkComparisonWorker, ComparisonWorker, MultiComparisonWorker, TestWorker,
};
use crate::port::{
    AdvanceTask, ConfigGenerator, Dispatcher, JobStore, ScriptBuilder, TestingService,
    TimeProvider,
};
use std::sync::Arc;

/// External handles the pipeline is built from
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn JobStore>,
    pub testing_service: Arc<dyn TestingService>,
    pub script_builder: Arc<dyn ScriptBuilder>,
    pub config_generator: Arc<dyn ConfigGenerator>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub time_provider: Arc<dyn TimeProvider>,
}

pub struct Pipeline {
    records: JobRecords,
    dispatcher: Arc<dyn Dispatcher>,
    test_factory: TestFactory,
    comparison_factory: ComparisonFactory,
    multi_comparison_factory: MultiComparisonFactory,
    bulk_comparison_factory: BulkComparisonFactory,
    test_worker: TestWorker,
    comparison_worker: ComparisonWorker,
    multi_comparison_worker: MultiComparisonWorker,
    bulk_comparison_worker: BulkComparisonWorker,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        let records = JobRecords::new(
            deps.store,
            deps.time_provider,
            config.max_update_attempts,
        );

        let test_factory = TestFactory::new(records.clone(), deps.config_generator);
        let comparison_factory = ComparisonFactory::new(records.clone(), test_factory.clone());
        let multi_comparison_factory = MultiComparisonFactory::new(records.clone());
        let bulk_comparison_factory = BulkComparisonFactory::new(records.clone());

        let test_worker = TestWorker::new(
            records.clone(),
            deps.testing_service,
            deps.script_builder,
            RetryPolicy::new(config.max_test_retries),
            config.submit_stale_after_ms,
        );
        let comparison_worker = ComparisonWorker::new(records.clone(), deps.dispatcher.clone());
        let multi_comparison_worker = MultiComparisonWorker::new(
            records.clone(),
            comparison_factory.clone(),
            deps.dispatcher.clone(),
        );
        let bulk_comparison_worker = BulkComparisonWorker::new(
            records.clone(),
            multi_comparison_factory.clone(),
            deps.dispatcher.clone(),
        );

        Self {
            records,
            dispatcher: deps.dispatcher,
            test_factory,
            comparison_factory,
            multi_comparison_factory,
            bulk_comparison_factory,
            test_worker,
            comparison_worker,
            multi_comparison_worker,
            bulk_comparison_worker,
        }
    }

    /// Route one task to the worker owning its job kind
    pub async fn advance(&self, task: &AdvanceTask) {
        match task {
            AdvanceTask::Test(id) => self.test_worker.advance(id).await,
            AdvanceTask::Comparison(id) => self.comparison_worker.advance(id).await,
            AdvanceTask::MultiComparison(id) => self.multi_comparison_worker.advance(id).await,
            AdvanceTask::BulkComparison(id) => self.bulk_comparison_worker.advance(id).await,
        }
    }

    pub fn records(&self) -> &JobRecords {
        &self.records
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn test_factory(&self) -> &TestFactory {
        &self.test_factory
    }

    pub fn comparison_factory(&self) -> &ComparisonFactory {
        &self.comparison_factory
    }

    pub fn multi_comparison_factory(&self) -> &MultiComparisonFactory {
        &self.multi_comparison_factory
    }

    pub fn bulk_comparison_factory(&self) -> &BulkComparisonFactory {
        &self.bulk_comparison_factory
    }

    pub fn test_worker(&self) -> &TestWorker {
        &self.test_worker
    }

    pub fn comparison_worker(&self) -> &ComparisonWorker {
        &self.comparison_worker
    }

    pub fn multi_comparison_worker(&self) -> &MultiComparisonWorker {
        &self.multi_comparison_worker
    }

    pub fn bulk_comparison_worker(&self) -> &BulkComparisonWorker {
        &self.bulk_comparison_worker
    }
}
