//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP.

use crate::handler::RpcHandler;
use crate::types::{
    JobRef, PingbackRequest, StartBulkComparisonRequest, StartComparisonRequest,
    StartMultiComparisonRequest, StartTestRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use speedcompare_core::application::CampaignService;
use speedcompare_core::error::{AppError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9627;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register one method taking a typed request object
macro_rules! register {
    ($module:expr, $name:literal, $handler:expr, $req:ty, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, service: Arc<CampaignService>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service)),
        }
    }

    /// All methods served by the API
    pub fn module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());

        register!(module, "test.start.v1", self.handler, StartTestRequest, start_test);
        register!(
            module,
            "comparison.start.v1",
            self.handler,
            StartComparisonRequest,
            start_comparison
        );
        register!(
            module,
            "multi_comparison.start.v1",
            self.handler,
            StartMultiComparisonRequest,
            start_multi_comparison
        );
        register!(
            module,
            "bulk_comparison.start.v1",
            self.handler,
            StartBulkComparisonRequest,
            start_bulk_comparison
        );
        register!(module, "job.status.v1", self.handler, JobRef, job_status);
        register!(module, "job.advance.v1", self.handler, JobRef, advance);
        register!(module, "wpt.pingback.v1", self.handler, PingbackRequest, pingback);

        Ok(module)
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind RPC server on {}: {}", addr, e)))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, server.start(module)))
    }
}
