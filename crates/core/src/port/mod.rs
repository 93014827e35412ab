// Port Layer - Interfaces for external dependencies

pub mod config_generator;
pub mod dispatcher;
pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod script_builder;
pub mod testing_service;
pub mod time_provider;

// Re-exports
pub use config_generator::{ConfigGenerator, RunContext};
pub use dispatcher::{AdvanceTask, Dispatcher};
pub use id_provider::IdProvider;
pub use job_store::{JobStore, StoredJob};
pub use script_builder::{ScriptBuilder, ScriptRequest};
pub use testing_service::{CollaboratorError, PollOutcome, TestSubmission, TestingService};
pub use time_provider::TimeProvider;
