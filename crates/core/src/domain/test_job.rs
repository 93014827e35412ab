// TestJob - one browser-test execution against the testing service

use serde::{Deserialize, Serialize};

use crate::domain::acceleration::AccelerationConfig;
use crate::domain::error::{DomainError, Result};
use crate::domain::job::{JobKind, JobMeta, JobRecord};
use crate::domain::params::RunParams;

/// Which side of a paired comparison a test measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestRole {
    Baseline,
    Accelerated,
}

impl TestRole {
    pub fn label(&self) -> &'static str {
        match self {
            TestRole::Baseline => "baseline",
            TestRole::Accelerated => "accelerated",
        }
    }
}

impl std::fmt::Display for TestRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Pending,
    Running,
    Finished,
    Error,
}

impl TestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Finished | TestStatus::Error)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Pending => write!(f, "PENDING"),
            TestStatus::Running => write!(f, "RUNNING"),
            TestStatus::Finished => write!(f, "FINISHED"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Timing metrics of one finished page load (first view)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestMetrics {
    pub ttfb_ms: Option<u64>,
    pub first_contentful_paint_ms: Option<u64>,
    pub dom_content_loaded_ms: Option<u64>,
    pub load_time_ms: Option<u64>,
    pub fully_loaded_ms: Option<u64>,
    pub speed_index: Option<u64>,
    pub requests: Option<u64>,
    pub bytes_in: Option<u64>,
    /// Hosts contacted during the load
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestJob {
    pub meta: JobMeta,
    pub role: TestRole,
    pub url: String,
    pub params: RunParams,
    /// Resolved config; only set for accelerated tests
    pub acceleration_config: Option<AccelerationConfig>,
    pub external_test_id: Option<String>,
    pub status: TestStatus,
    pub retry_count: u32,
    /// When the current submission was claimed (epoch ms)
    pub submitted_at: Option<i64>,
    pub result: Option<TestMetrics>,
    pub failure: Option<String>,
}

impl JobRecord for TestJob {
    const KIND: JobKind = JobKind::Test;

    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    fn external_test_id(&self) -> Option<&str> {
        self.external_test_id.as_deref()
    }
}

impl TestJob {
    pub fn new(
        meta: JobMeta,
        role: TestRole,
        url: impl Into<String>,
        params: RunParams,
        acceleration_config: Option<AccelerationConfig>,
    ) -> Self {
        Self {
            meta,
            role,
            url: url.into(),
            params,
            acceleration_config,
            external_test_id: None,
            status: TestStatus::Pending,
            retry_count: 0,
            submitted_at: None,
            result: None,
            failure: None,
        }
    }

    /// Config passed to the script builder (accelerated role only)
    pub fn script_config(&self) -> Option<&AccelerationConfig> {
        match self.role {
            TestRole::Accelerated => self.acceleration_config.as_ref(),
            TestRole::Baseline => None,
        }
    }

    /// Claim the single outbound submission: Pending -> Running
    pub fn claim(&mut self, now_millis: i64) -> Result<()> {
        if self.status != TestStatus::Pending {
            return Err(self.invalid_transition("RUNNING"));
        }
        self.status = TestStatus::Running;
        self.submitted_at = Some(now_millis);
        Ok(())
    }

    /// Store the id returned by the testing service for the claimed submission
    pub fn record_submission(&mut self, external_test_id: impl Into<String>) -> Result<()> {
        if self.status != TestStatus::Running || self.external_test_id.is_some() {
            return Err(self.invalid_transition("SUBMITTED"));
        }
        self.external_test_id = Some(external_test_id.into());
        Ok(())
    }

    /// Running -> Finished with metrics
    pub fn complete(&mut self, metrics: TestMetrics) -> Result<()> {
        if self.status != TestStatus::Running {
            return Err(self.invalid_transition("FINISHED"));
        }
        self.status = TestStatus::Finished;
        self.result = Some(metrics);
        self.failure = None;
        self.meta.finished = true;
        Ok(())
    }

    /// Terminal failure after retries are exhausted
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = TestStatus::Error;
        self.result = None;
        self.failure = Some(reason.into());
        self.meta.finished = true;
    }

    /// Drop the current submission so the next advance submits again
    pub fn requeue(&mut self) {
        self.status = TestStatus::Pending;
        self.external_test_id = None;
        self.submitted_at = None;
    }

    fn invalid_transition(&self, to: &str) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
