//! RPC Request/Response Types
//!
//! Start requests reuse the application request types; the rest are defined here.

use serde::{Deserialize, Serialize};

pub use speedcompare_core::application::{
    StartBulkComparisonRequest, StartComparisonRequest, StartMultiComparisonRequest,
    StartTestRequest,
};

/// Result of every `*.start.v1` method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub job_id: String,
    pub kind: String,
}

/// job.status.v1 / job.advance.v1 - address one job
#[derive(Debug, Deserialize)]
pub struct JobRef {
    /// TEST, COMPARISON, MULTI_COMPARISON or BULK_COMPARISON (case-insensitive)
    pub kind: String,
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub kind: String,
    pub finished: bool,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Full stored document
    pub job: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceResponse {
    pub job_id: String,
    pub dispatched: bool,
}

/// wpt.pingback.v1 - a test finished on the testing service
#[derive(Debug, Deserialize)]
pub struct PingbackRequest {
    /// Testing-service test id
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingbackResponse {
    pub job_id: String,
}
