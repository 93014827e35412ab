// Script Builder Port
// The pipeline never inspects the produced script

use crate::domain::AccelerationConfig;
use crate::port::CollaboratorError;

/// Inputs for one test script
#[derive(Debug, Clone)]
pub struct ScriptRequest<'a> {
    pub url: &'a str,
    /// Present only for accelerated tests
    pub acceleration_config: Option<&'a AccelerationConfig>,
    pub location: &'a str,
    pub activity_timeout_ms: u64,
    pub timeout_secs: u64,
}

pub trait ScriptBuilder: Send + Sync {
    fn build_script(&self, request: &ScriptRequest<'_>) -> Result<String, CollaboratorError>;
}

pub mod mocks {
    use super::*;

    /// One-line script that records whether a config was supplied
    pub struct PlainScriptBuilder;

    impl ScriptBuilder for PlainScriptBuilder {
        fn build_script(&self, request: &ScriptRequest<'_>) -> Result<String, CollaboratorError> {
            let mode = if request.acceleration_config.is_some() {
                "accelerated"
            } else {
                "baseline"
            };
            Ok(format!("// {}\nnavigate\t{}", mode, request.url))
        }
    }
}
