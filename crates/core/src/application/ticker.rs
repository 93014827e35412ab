// Ticker - the external scheduler re-driving every unfinished job

use crate::application::worker::constants::{ERROR_RECOVERY_SLEEP_DURATION, MIN_TICK_INTERVAL};
use crate::application::worker::ShutdownToken;
use crate::domain::JobKind;
use crate::error::Result;
use crate::port::{AdvanceTask, Dispatcher, JobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct Ticker {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn Dispatcher>,
    interval: Duration,
}

impl Ticker {
    /// `interval` is raised to `MIN_TICK_INTERVAL` if shorter
    pub fn new(store: Arc<dyn JobStore>, dispatcher: Arc<dyn Dispatcher>, interval: Duration) -> Self {
        Self {
            store,
            dispatcher,
            interval: interval.max(MIN_TICK_INTERVAL),
        }
    }

    /// Dispatch an advance for every unfinished job, leaves first
    ///
    /// Returns the number of dispatched tasks.
    pub async fn tick(&self) -> Result<usize> {
        let mut dispatched = 0;
        for kind in JobKind::ALL {
            for job in self.store.find_unfinished(kind).await? {
                self.dispatcher.dispatch(AdvanceTask::new(kind, job.id));
                dispatched += 1;
            }
        }
        debug!(dispatched = dispatched, "Tick");
        Ok(dispatched)
    }

    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Ticker started");
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = ?e, "Tick failed");
                        tokio::select! {
                            _ = tokio::time::sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                            _ = shutdown.wait() => break,
                        }
                    }
                }
                _ = shutdown.wait() => break,
            }
        }
        info!("Ticker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::Harness;
    use crate::domain::{ComparisonSpec, RunParams};

    #[tokio::test]
    async fn test_tick_dispatches_unfinished_jobs_leaves_first() {
        let h = Harness::new();
        h.pipeline
            .bulk_comparison_factory()
            .create("b-1".to_string(), "alice", vec![ComparisonSpec::new("https://a.example")])
            .await
            .unwrap();
        h.pipeline
            .comparison_factory()
            .create("c-1".to_string(), "alice", "https://a.example", &RunParams::default())
            .await
            .unwrap();

        let ticker = Ticker::new(h.store.clone(), h.dispatcher.clone(), Duration::from_secs(10));
        assert_eq!(ticker.tick().await.unwrap(), 4);
        assert_eq!(
            h.dispatcher.drain(),
            vec![
                AdvanceTask::Test("c-1-baseline".to_string()),
                AdvanceTask::Test("c-1-accelerated".to_string()),
                AdvanceTask::Comparison("c-1".to_string()),
                AdvanceTask::BulkComparison("b-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ticks_drive_a_campaign_to_completion() {
        let h = Harness::new();
        h.testing.complete_all();
        h.pipeline
            .bulk_comparison_factory()
            .create("b-1".to_string(), "alice", vec![ComparisonSpec::new("https://a.example")])
            .await
            .unwrap();

        let ticker = Ticker::new(h.store.clone(), h.dispatcher.clone(), Duration::from_secs(10));
        for _ in 0..20 {
            if ticker.tick().await.unwrap() == 0 {
                break;
            }
            h.run_dispatched().await;
        }

        assert_eq!(ticker.tick().await.unwrap(), 0);
        assert_eq!(h.testing.submit_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_interval_still_ticks() {
        let h = Harness::new();
        h.pipeline
            .comparison_factory()
            .create("c-1".to_string(), "alice", "https://a.example", &RunParams::default())
            .await
            .unwrap();

        let ticker = Ticker::new(h.store.clone(), h.dispatcher.clone(), Duration::ZERO);
        assert_eq!(ticker.interval, MIN_TICK_INTERVAL);

        let (shutdown_tx, shutdown_rx) = crate::application::shutdown_channel();
        let handle = tokio::spawn(async move { ticker.run(shutdown_rx).await });
        while h.dispatcher.pending().is_empty() {
            tokio::task::yield_now().await;
        }
        shutdown_tx.shutdown();
        tokio_test::assert_ok!(handle.await);
    }
}
