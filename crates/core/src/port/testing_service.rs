// Testing Service Port
// Abstraction over the external browser-testing service

use crate::domain::TestMetrics;
use async_trait::async_trait;
use thiserror::Error;

/// Everything the testing service needs to run one test
#[derive(Debug, Clone, PartialEq)]
pub struct TestSubmission {
    /// Opaque test script
    pub script: String,
    pub url: String,
    pub location: String,
    pub mobile: bool,
    /// Also measure the repeat view
    pub caching: bool,
    /// Human-readable label shown in the service UI
    pub label: String,
}

/// Progress of a submitted test
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Queued or still running
    Pending,
    Complete(TestMetrics),
    /// The service gave up on the test
    Failed(String),
}

/// Failures talking to an external collaborator (all transient for the pipeline)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service responded with status {0}")]
    Status(u16),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Browser-testing service client
///
/// Implementations:
/// - WptClient: WebPageTest HTTP API (infra-wpt)
#[async_trait]
pub trait TestingService: Send + Sync {
    /// Submit a test and return the service's test id
    async fn submit(&self, submission: &TestSubmission) -> Result<String, CollaboratorError>;

    /// Check a previously submitted test
    async fn poll(&self, external_test_id: &str) -> Result<PollOutcome, CollaboratorError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        submissions: Vec<TestSubmission>,
        submit_failures: usize,
        poll_failures: usize,
        poll_count: usize,
        outcomes: HashMap<String, PollOutcome>,
        default_outcome: Option<PollOutcome>,
    }

    /// Scripted testing service; ids are `wpt-1`, `wpt-2`, ...
    #[derive(Default)]
    pub struct MockTestingService {
        state: Mutex<State>,
    }

    impl MockTestingService {
        /// Every test stays pending until told otherwise
        pub fn new() -> Self {
            Self::default()
        }

        /// Every test completes on its first poll
        pub fn completing() -> Self {
            let service = Self::new();
            service.complete_all();
            service
        }

        pub fn sample_metrics() -> TestMetrics {
            TestMetrics {
                ttfb_ms: Some(120),
                first_contentful_paint_ms: Some(800),
                dom_content_loaded_ms: Some(900),
                load_time_ms: Some(1_500),
                fully_loaded_ms: Some(2_000),
                speed_index: Some(1_100),
                requests: Some(42),
                bytes_in: Some(512_000),
                domains: vec!["a.example".to_string()],
            }
        }

        pub fn complete_all(&self) {
            self.state.lock().unwrap().default_outcome =
                Some(PollOutcome::Complete(Self::sample_metrics()));
        }

        pub fn set_outcome(&self, external_test_id: impl Into<String>, outcome: PollOutcome) {
            self.state
                .lock()
                .unwrap()
                .outcomes
                .insert(external_test_id.into(), outcome);
        }

        /// Fail the next `n` submissions with a 503
        pub fn fail_submissions(&self, n: usize) {
            self.state.lock().unwrap().submit_failures = n;
        }

        /// Fail the next `n` polls with a network error
        pub fn fail_polls(&self, n: usize) {
            self.state.lock().unwrap().poll_failures = n;
        }

        pub fn submit_count(&self) -> usize {
            self.state.lock().unwrap().submissions.len()
        }

        pub fn poll_count(&self) -> usize {
            self.state.lock().unwrap().poll_count
        }

        pub fn submissions(&self) -> Vec<TestSubmission> {
            self.state.lock().unwrap().submissions.clone()
        }
    }

    #[async_trait]
    impl TestingService for MockTestingService {
        async fn submit(&self, submission: &TestSubmission) -> Result<String, CollaboratorError> {
            let mut state = self.state.lock().unwrap();
            if state.submit_failures > 0 {
                state.submit_failures -= 1;
                return Err(CollaboratorError::Status(503));
            }
            state.submissions.push(submission.clone());
            Ok(format!("wpt-{}", state.submissions.len()))
        }

        async fn poll(&self, external_test_id: &str) -> Result<PollOutcome, CollaboratorError> {
            // Suspend like a network round trip so concurrent advances interleave
            tokio::task::yield_now().await;
            let mut state = self.state.lock().unwrap();
            state.poll_count += 1;
            if state.poll_failures > 0 {
                state.poll_failures -= 1;
                return Err(CollaboratorError::Network("connection reset".to_string()));
            }
            Ok(state
                .outcomes
                .get(external_test_id)
                .or(state.default_outcome.as_ref())
                .cloned()
                .unwrap_or(PollOutcome::Pending))
        }
    }
}
