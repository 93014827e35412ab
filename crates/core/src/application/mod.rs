// Application Layer - Workers, factories and the orchestration around them

pub mod campaign;
pub mod config;
pub mod dispatch;
pub mod factory;
pub mod pipeline;
pub mod records;
pub mod retry;
pub mod ticker;
pub mod worker;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-exports
pub use campaign::{
    CampaignService, StartBulkComparisonRequest, StartComparisonRequest,
    StartMultiComparisonRequest, StartTestRequest,
};
pub use config::PipelineConfig;
pub use dispatch::{dispatch_channel, ChannelDispatcher, DispatchLoop};
pub use factory::{BulkComparisonFactory, ComparisonFactory, MultiComparisonFactory, TestFactory};
pub use pipeline::{Pipeline, PipelineDeps};
pub use records::{JobRecords, Transition};
pub use retry::{RetryAction, RetryDecision, RetryPolicy};
pub use ticker::Ticker;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken};
