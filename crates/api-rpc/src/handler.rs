//! RPC Method Handlers
//!
//! Thin translation between RPC types and the campaign service.

use crate::error::to_rpc_error;
use crate::types::{
    AdvanceResponse, JobRef, JobStatusResponse, PingbackRequest, PingbackResponse,
    StartBulkComparisonRequest, StartComparisonRequest, StartMultiComparisonRequest,
    StartResponse, StartTestRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use speedcompare_core::application::CampaignService;
use speedcompare_core::domain::{JobKind, JobRecord};
use speedcompare_core::error::AppError;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<CampaignService>,
}

fn started<J: JobRecord>(job: &J) -> StartResponse {
    StartResponse {
        job_id: job.id().to_string(),
        kind: J::KIND.to_string(),
    }
}

fn parse_kind(kind: &str) -> Result<JobKind, ErrorObjectOwned> {
    kind.parse::<JobKind>()
        .map_err(|e| to_rpc_error(AppError::from(e)))
}

impl RpcHandler {
    pub fn new(service: Arc<CampaignService>) -> Self {
        Self { service }
    }

    /// test.start.v1
    pub async fn start_test(&self, req: StartTestRequest) -> Result<StartResponse, ErrorObjectOwned> {
        let job = self.service.start_test(req).await.map_err(to_rpc_error)?;
        Ok(started(&job))
    }

    /// comparison.start.v1
    pub async fn start_comparison(
        &self,
        req: StartComparisonRequest,
    ) -> Result<StartResponse, ErrorObjectOwned> {
        let job = self
            .service
            .start_comparison(req)
            .await
            .map_err(to_rpc_error)?;
        Ok(started(&job))
    }

    /// multi_comparison.start.v1
    pub async fn start_multi_comparison(
        &self,
        req: StartMultiComparisonRequest,
    ) -> Result<StartResponse, ErrorObjectOwned> {
        let job = self
            .service
            .start_multi_comparison(req)
            .await
            .map_err(to_rpc_error)?;
        Ok(started(&job))
    }

    /// bulk_comparison.start.v1
    pub async fn start_bulk_comparison(
        &self,
        req: StartBulkComparisonRequest,
    ) -> Result<StartResponse, ErrorObjectOwned> {
        let job = self
            .service
            .start_bulk_comparison(req)
            .await
            .map_err(to_rpc_error)?;
        info!(job_id = %job.meta.id, urls = job.comparisons_to_start.len(), "Campaign accepted");
        Ok(started(&job))
    }

    /// job.status.v1
    pub async fn job_status(&self, req: JobRef) -> Result<JobStatusResponse, ErrorObjectOwned> {
        let kind = parse_kind(&req.kind)?;
        let stored = self
            .service
            .job_status(kind, &req.job_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(JobStatusResponse {
            job: stored.document(),
            job_id: stored.id,
            kind: stored.kind.to_string(),
            finished: stored.finished,
            version: stored.version,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    /// job.advance.v1
    pub async fn advance(&self, req: JobRef) -> Result<AdvanceResponse, ErrorObjectOwned> {
        let kind = parse_kind(&req.kind)?;
        self.service
            .advance(kind, &req.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(AdvanceResponse {
            job_id: req.job_id,
            dispatched: true,
        })
    }

    /// wpt.pingback.v1
    pub async fn pingback(&self, req: PingbackRequest) -> Result<PingbackResponse, ErrorObjectOwned> {
        let job_id = self.service.pingback(&req.id).await.map_err(to_rpc_error)?;
        Ok(PingbackResponse { job_id })
    }
}
