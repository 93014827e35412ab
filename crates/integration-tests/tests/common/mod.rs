//! Shared wiring: the real pipeline on the SQLite store, with scripted collaborators
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use speedcompare_core::application::{CampaignService, Pipeline, PipelineConfig, PipelineDeps, Ticker};
use speedcompare_core::domain::JobRecord;
use speedcompare_core::port::config_generator::mocks::StaticConfigGenerator;
use speedcompare_core::port::dispatcher::mocks::RecordingDispatcher;
use speedcompare_core::port::id_provider::mocks::SequentialIdProvider;
use speedcompare_core::port::script_builder::mocks::PlainScriptBuilder;
use speedcompare_core::port::testing_service::mocks::MockTestingService;
use speedcompare_core::port::time_provider::mocks::ManualClock;
use speedcompare_core::port::{AdvanceTask, Dispatcher};
use speedcompare_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};

pub const START_MILLIS: i64 = 1_700_000_000_000;

/// SQLite file removed (with its WAL files) on drop
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("speedcompare-{}.db", uuid::Uuid::new_v4())),
        }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

pub struct Env {
    pub store: Arc<SqliteJobStore>,
    pub clock: Arc<ManualClock>,
    pub testing: Arc<MockTestingService>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub pipeline: Arc<Pipeline>,
    pub service: CampaignService,
    pub ticker: Ticker,
}

impl Env {
    pub async fn in_memory(testing: MockTestingService) -> Self {
        Self::connect("sqlite::memory:", testing, PipelineConfig::default()).await
    }

    pub async fn with_config(testing: MockTestingService, config: PipelineConfig) -> Self {
        Self::connect("sqlite::memory:", testing, config).await
    }

    pub async fn on_file(db: &TempDb, testing: MockTestingService) -> Self {
        Self::connect(&db.url(), testing, PipelineConfig::default()).await
    }

    pub async fn connect(url: &str, testing: MockTestingService, config: PipelineConfig) -> Self {
        let pool = create_pool(url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let store = Arc::new(SqliteJobStore::new(pool));
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let testing = Arc::new(testing);
        let dispatcher = Arc::new(RecordingDispatcher::new());

        let pipeline = Arc::new(Pipeline::new(
            PipelineDeps {
                store: store.clone(),
                testing_service: testing.clone(),
                script_builder: Arc::new(PlainScriptBuilder),
                config_generator: Arc::new(StaticConfigGenerator::new()),
                dispatcher: dispatcher.clone(),
                time_provider: clock.clone(),
            },
            config,
        ));
        let service = CampaignService::new(
            pipeline.clone(),
            Arc::new(SequentialIdProvider::new("campaign")),
        );
        let ticker = Ticker::new(store.clone(), dispatcher.clone(), Duration::from_secs(10));

        Self {
            store,
            clock,
            testing,
            dispatcher,
            pipeline,
            service,
            ticker,
        }
    }

    pub async fn load<J: JobRecord>(&self, id: &str) -> J {
        self.pipeline.records().load(id).await.unwrap()
    }

    /// Advance every recorded task exactly once, in dispatch order
    pub async fn run_batch(&self) -> Vec<AdvanceTask> {
        let batch = self.dispatcher.drain();
        for task in &batch {
            self.pipeline.advance(task).await;
        }
        batch
    }

    /// Run recorded tasks, including the ones they dispatch, until none are left
    pub async fn run_dispatched(&self) -> Vec<AdvanceTask> {
        let mut ran = Vec::new();
        loop {
            let batch = self.run_batch().await;
            if batch.is_empty() {
                return ran;
            }
            ran.extend(batch);
        }
    }

    /// One scheduler tick followed by everything it sets in motion
    pub async fn tick(&self) -> usize {
        let dispatched = self.ticker.tick().await.unwrap();
        self.run_dispatched().await;
        dispatched
    }

    /// Tick until nothing is unfinished; returns the number of ticks used
    pub async fn tick_until_idle(&self, max_ticks: usize) -> usize {
        for ticks in 0..max_ticks {
            if self.ticker.tick().await.unwrap() == 0 {
                return ticks;
            }
            self.run_dispatched().await;
        }
        panic!("jobs still unfinished after {} ticks", max_ticks);
    }

    pub fn dispatch(&self, task: AdvanceTask) {
        self.dispatcher.dispatch(task);
    }
}
