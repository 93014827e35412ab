// Shared unit-test wiring: the full pipeline on in-memory mocks

use crate::application::config::PipelineConfig;
use crate::application::pipeline::{Pipeline, PipelineDeps};
use crate::application::records::JobRecords;
use crate::port::config_generator::mocks::StaticConfigGenerator;
use crate::port::dispatcher::mocks::RecordingDispatcher;
use crate::port::job_store::mocks::InMemoryJobStore;
use crate::port::script_builder::mocks::PlainScriptBuilder;
use crate::port::testing_service::mocks::MockTestingService;
use crate::port::time_provider::mocks::ManualClock;
use crate::port::{AdvanceTask, Dispatcher};
use std::sync::Arc;

pub(crate) struct Harness {
    pub store: Arc<InMemoryJobStore>,
    pub clock: Arc<ManualClock>,
    pub testing: Arc<MockTestingService>,
    pub generator: Arc<StaticConfigGenerator>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub pipeline: Arc<Pipeline>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(PipelineConfig::default(), None)
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::build(config, None)
    }

    /// Pipeline dispatching through `dispatcher` instead of the recorder
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::build(PipelineConfig::default(), Some(dispatcher))
    }

    fn build(config: PipelineConfig, dispatcher: Option<Arc<dyn Dispatcher>>) -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let testing = Arc::new(MockTestingService::new());
        let generator = Arc::new(StaticConfigGenerator::new());
        let recorder = Arc::new(RecordingDispatcher::new());
        let dispatcher: Arc<dyn Dispatcher> = match dispatcher {
            Some(dispatcher) => dispatcher,
            None => recorder.clone(),
        };

        let deps = PipelineDeps {
            store: store.clone(),
            testing_service: testing.clone(),
            script_builder: Arc::new(PlainScriptBuilder),
            config_generator: generator.clone(),
            dispatcher,
            time_provider: clock.clone(),
        };

        Self {
            store,
            clock,
            testing,
            generator,
            dispatcher: recorder,
            pipeline: Arc::new(Pipeline::new(deps, config)),
        }
    }

    pub fn records(&self) -> &JobRecords {
        self.pipeline.records()
    }

    /// Run recorded tasks, including the ones they dispatch, until none are left
    pub async fn run_dispatched(&self) -> Vec<AdvanceTask> {
        let mut ran = Vec::new();
        loop {
            let batch = self.dispatcher.drain();
            if batch.is_empty() {
                return ran;
            }
            for task in batch {
                self.pipeline.advance(&task).await;
                ran.push(task);
            }
        }
    }
}
