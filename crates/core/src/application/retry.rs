// Retry accounting for TestJobs
use crate::domain::TestJob;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Count the failure and try again on a later advance
    Retry,
    /// Do not retry, job has failed permanently
    Failed,
}

/// What the next attempt has to do after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Submit the test again (submission failed, was lost, or the service gave up)
    Resubmit,
    /// Poll the existing submission again
    Repoll,
}

/// Bounded retry policy for transient testing-service failures
///
/// A job tolerates `max_retries` failures. The next one is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide whether one more failure can be absorbed
    pub fn should_retry(&self, job: &TestJob) -> RetryDecision {
        if job.retry_count >= self.max_retries {
            warn!(
                job_id = %job.meta.id,
                retry_count = job.retry_count,
                max_retries = self.max_retries,
                "Max retry attempts reached"
            );
            return RetryDecision::Failed;
        }
        RetryDecision::Retry
    }

    /// Apply one transient failure to the job
    ///
    /// Either counts it and prepares the next attempt, or marks the job ERROR.
    /// Returns the decision taken.
    pub fn record_failure(
        &self,
        job: &mut TestJob,
        reason: &str,
        action: RetryAction,
    ) -> RetryDecision {
        let decision = self.should_retry(job);
        match decision {
            RetryDecision::Failed => {
                job.fail(format!(
                    "Gave up after {} retries: {}",
                    self.max_retries, reason
                ));
            }
            RetryDecision::Retry => {
                job.retry_count += 1;
                if action == RetryAction::Resubmit {
                    job.requeue();
                }
                info!(
                    job_id = %job.meta.id,
                    retry_count = job.retry_count,
                    action = ?action,
                    reason = %reason,
                    "Test prepared for retry"
                );
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobMeta, RunParams, TestRole, TestStatus};

    fn running_job() -> TestJob {
        let mut job = TestJob::new(
            JobMeta::new("t-1", "tester", 0),
            TestRole::Baseline,
            "https://a.example",
            RunParams::default(),
            None,
        );
        job.claim(1).unwrap();
        job.record_submission("wpt-1").unwrap();
        job
    }

    #[test]
    fn test_error_exactly_after_max_retries() {
        let policy = RetryPolicy::new(3);
        let mut job = running_job();

        for expected in 1..=3 {
            let decision = policy.record_failure(&mut job, "503", RetryAction::Repoll);
            assert_eq!(decision, RetryDecision::Retry);
            assert_eq!(job.retry_count, expected);
            assert_eq!(job.status, TestStatus::Running);
        }

        let decision = policy.record_failure(&mut job, "503", RetryAction::Repoll);
        assert_eq!(decision, RetryDecision::Failed);
        assert_eq!(job.status, TestStatus::Error);
        assert_eq!(job.retry_count, 3);
        assert!(job.meta.finished);
        assert!(job.failure.as_deref().unwrap().contains("503"));
    }

    #[test]
    fn test_resubmit_requeues() {
        let policy = RetryPolicy::new(3);
        let mut job = running_job();

        policy.record_failure(&mut job, "lost", RetryAction::Resubmit);

        assert_eq!(job.status, TestStatus::Pending);
        assert!(job.external_test_id.is_none());
        assert_eq!(job.retry_count, 1);
    }

    #[test]
    fn test_zero_retries_fails_immediately() {
        let policy = RetryPolicy::new(0);
        let mut job = running_job();
        assert_eq!(
            policy.record_failure(&mut job, "timeout", RetryAction::Repoll),
            RetryDecision::Failed
        );
    }
}
