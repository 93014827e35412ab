// Dispatcher Port
// Fire-and-forget hand-off of `advance` calls

use crate::domain::{JobId, JobKind};
use serde::{Deserialize, Serialize};

/// One unit of work: advance a single job by one step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "job_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceTask {
    Test(JobId),
    Comparison(JobId),
    MultiComparison(JobId),
    BulkComparison(JobId),
}

impl AdvanceTask {
    pub fn new(kind: JobKind, job_id: impl Into<JobId>) -> Self {
        let job_id = job_id.into();
        match kind {
            JobKind::Test => AdvanceTask::Test(job_id),
            JobKind::Comparison => AdvanceTask::Comparison(job_id),
            JobKind::MultiComparison => AdvanceTask::MultiComparison(job_id),
            JobKind::BulkComparison => AdvanceTask::BulkComparison(job_id),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            AdvanceTask::Test(_) => JobKind::Test,
            AdvanceTask::Comparison(_) => JobKind::Comparison,
            AdvanceTask::MultiComparison(_) => JobKind::MultiComparison,
            AdvanceTask::BulkComparison(_) => JobKind::BulkComparison,
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            AdvanceTask::Test(id)
            | AdvanceTask::Comparison(id)
            | AdvanceTask::MultiComparison(id)
            | AdvanceTask::BulkComparison(id) => id,
        }
    }
}

/// Never blocks and never reports the outcome of the task
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: AdvanceTask);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Collects tasks so tests can run them one by one
    #[derive(Default)]
    pub struct RecordingDispatcher {
        tasks: Mutex<Vec<AdvanceTask>>,
    }

    impl RecordingDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Take all pending tasks in dispatch order
        pub fn drain(&self) -> Vec<AdvanceTask> {
            std::mem::take(&mut *self.tasks.lock().unwrap())
        }

        pub fn pending(&self) -> Vec<AdvanceTask> {
            self.tasks.lock().unwrap().clone()
        }
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&self, task: AdvanceTask) {
            self.tasks.lock().unwrap().push(task);
        }
    }
}
