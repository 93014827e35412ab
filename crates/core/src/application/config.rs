// Pipeline configuration

use crate::application::worker::constants::{
    DEFAULT_MAX_TEST_RETRIES, DEFAULT_MAX_UPDATE_ATTEMPTS, DEFAULT_SUBMIT_STALE_AFTER_MS,
};

/// Behavior knobs of the job pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Transient failures tolerated per TestJob
    pub max_test_retries: u32,
    /// Attempts of one optimistic update
    pub max_update_attempts: usize,
    /// Age after which a claimed but unconfirmed submission counts as lost
    pub submit_stale_after_ms: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_test_retries: DEFAULT_MAX_TEST_RETRIES,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
            submit_stale_after_ms: DEFAULT_SUBMIT_STALE_AFTER_MS,
        }
    }
}
