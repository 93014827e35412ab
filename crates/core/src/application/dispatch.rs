// Channel-backed dispatcher and the loop that runs dispatched tasks

use crate::application::pipeline::Pipeline;
use crate::application::worker::ShutdownToken;
use crate::port::{AdvanceTask, Dispatcher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Enqueues tasks on an unbounded channel; never blocks the caller
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<AdvanceTask>,
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, task: AdvanceTask) {
        debug!(kind = %task.kind(), job_id = %task.job_id(), "Dispatching advance");
        if self.tx.send(task).is_err() {
            warn!("Dispatch loop stopped, task dropped");
        }
    }
}

/// Create a dispatcher and the receiving end for `DispatchLoop`
pub fn dispatch_channel() -> (ChannelDispatcher, mpsc::UnboundedReceiver<AdvanceTask>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelDispatcher { tx }, rx)
}

/// Runs every received task as its own tokio task, never joining on it
pub struct DispatchLoop {
    pipeline: Arc<Pipeline>,
    rx: mpsc::UnboundedReceiver<AdvanceTask>,
}

impl DispatchLoop {
    pub fn new(pipeline: Arc<Pipeline>, rx: mpsc::UnboundedReceiver<AdvanceTask>) -> Self {
        Self { pipeline, rx }
    }

    pub async fn run(mut self, mut shutdown: ShutdownToken) {
        info!("Dispatch loop started");
        loop {
            tokio::select! {
                task = self.rx.recv() => {
                    let Some(task) = task else {
                        info!("All dispatchers dropped");
                        break;
                    };
                    self.spawn(task);
                }
                _ = shutdown.wait() => {
                    info!("Dispatch loop shutting down");
                    break;
                }
            }
        }
        info!("Dispatch loop stopped");
    }

    fn spawn(&self, task: AdvanceTask) {
        let pipeline = Arc::clone(&self.pipeline);
        // A panic inside advance stays inside this task
        tokio::spawn(async move {
            let job_id = task.job_id().to_string();
            let guarded = tokio::spawn(async move { pipeline.advance(&task).await });
            if let Err(e) = guarded.await {
                error!(job_id = %job_id, error = %e, "Advance task panicked");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::Harness;
    use crate::application::worker::shutdown_channel;
    use crate::domain::{ComparisonJob, RunParams};
    use std::time::Duration;

    #[tokio::test]
    async fn test_loop_runs_dispatched_tasks() {
        let (dispatcher, rx) = dispatch_channel();
        let h = Harness::with_dispatcher(Arc::new(dispatcher.clone()));
        h.pipeline
            .comparison_factory()
            .create("c-1".to_string(), "tester", "https://a.example", &RunParams::default())
            .await
            .unwrap();

        let (sender, token) = shutdown_channel();
        let handle = tokio::spawn(DispatchLoop::new(h.pipeline.clone(), rx).run(token));

        dispatcher.dispatch(AdvanceTask::Comparison("c-1".to_string()));

        // The comparison dispatches both tests, which submit
        for _ in 0..100 {
            if h.testing.submit_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.testing.submit_count(), 2);
        let job: ComparisonJob = h.records().load("c-1").await.unwrap();
        assert!(job.tests_started);

        sender.shutdown();
        handle.await.unwrap();
    }
}
