// Domain Layer - Job hierarchy and run parameters

pub mod acceleration;
pub mod comparison;
pub mod error;
pub mod job;
pub mod params;
pub mod test_job;

// Re-exports
pub use acceleration::{AccelerationConfig, ConfigBuilder, Rule, RuleSection};
pub use comparison::{BulkComparisonJob, ComparisonJob, MultiComparisonJob};
pub use error::DomainError;
pub use job::{child_id, JobId, JobKind, JobMeta, JobRecord};
pub use params::{ComparisonSpec, RunParams};
pub use test_job::{TestJob, TestMetrics, TestRole, TestStatus};
