// Config Generator Port
// Produces the acceleration config attached to accelerated tests

use crate::domain::{AccelerationConfig, TestMetrics};
use crate::port::CollaboratorError;
use async_trait::async_trait;

/// What the generator may know about the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    pub mobile: bool,
    /// Metrics of an earlier run of the same URL, if any
    pub prior_result: Option<TestMetrics>,
}

#[async_trait]
pub trait ConfigGenerator: Send + Sync {
    async fn generate(
        &self,
        url: &str,
        context: &RunContext,
    ) -> Result<AccelerationConfig, CollaboratorError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ConfigBuilder;
    use std::sync::Mutex;

    /// Whitelists the requested URL verbatim and records every context
    #[derive(Default)]
    pub struct StaticConfigGenerator {
        contexts: Mutex<Vec<RunContext>>,
    }

    impl StaticConfigGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn call_count(&self) -> usize {
            self.contexts.lock().unwrap().len()
        }

        pub fn contexts(&self) -> Vec<RunContext> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConfigGenerator for StaticConfigGenerator {
        async fn generate(
            &self,
            url: &str,
            context: &RunContext,
        ) -> Result<AccelerationConfig, CollaboratorError> {
            self.contexts.lock().unwrap().push(context.clone());
            Ok(ConfigBuilder::new("test-app", context.mobile)
                .whitelist_url(url)
                .build())
        }
    }
}
