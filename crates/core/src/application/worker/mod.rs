// Workers - one per job kind, each advancing its job by a single step

pub mod bulk_comparison;
pub mod comparison;
pub mod constants;
pub mod multi_comparison;
mod shutdown;

pub use bulk_comparison::BulkComparisonWorker;
pub use comparison::ComparisonWorker;
pub use multi_comparison::MultiComparisonWorker;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use test::TestWorker;
