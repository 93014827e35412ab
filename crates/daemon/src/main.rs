//! Speedcompare Daemon - Main Entry Point
//! JSON-RPC server + dispatch loop + scheduler tick

mod config;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat};
use speedcompare_api_rpc::{RpcServer, RpcServerConfig};
use speedcompare_core::application::{
    dispatch_channel, shutdown_channel, CampaignService, DispatchLoop, Pipeline, PipelineDeps,
    Ticker,
};
use speedcompare_core::port::id_provider::UuidProvider;
use speedcompare_core::port::time_provider::SystemTimeProvider;
use speedcompare_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};
use speedcompare_infra_wpt::{DomainConfigGenerator, WptClient, WptClientConfig, WptScriptBuilder};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("speedcompare=info"))?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration + logging
    let config = DaemonConfig::from_env()?;
    init_logging(config.log_format)?;
    info!("Speedcompare v{} starting...", VERSION);

    // 2. Database
    if let Some(dir) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(dir)?;
    }
    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&config.database_url())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Adapters (DI wiring)
    let store = Arc::new(SqliteJobStore::new(pool));
    let testing_service = Arc::new(
        WptClient::new(WptClientConfig {
            api_key: config.wpt_api_key.clone(),
            pingback_url: config.pingback_url.clone(),
            ..WptClientConfig::new(config.wpt_url.clone())
        })
        .map_err(|e| anyhow::anyhow!("Testing service client failed: {}", e))?,
    );
    let (dispatcher, dispatch_rx) = dispatch_channel();
    let dispatcher = Arc::new(dispatcher);

    let pipeline = Arc::new(Pipeline::new(
        PipelineDeps {
            store: store.clone(),
            testing_service,
            script_builder: Arc::new(WptScriptBuilder::new(
                config.origin_ip.clone(),
                config.app_name.clone(),
            )),
            config_generator: Arc::new(DomainConfigGenerator::new(config.app_name.clone())),
            dispatcher: dispatcher.clone(),
            time_provider: Arc::new(SystemTimeProvider),
        },
        config.pipeline.clone(),
    ));

    // 4. Dispatch loop + scheduler tick
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let dispatch_loop = DispatchLoop::new(pipeline.clone(), dispatch_rx);
    let dispatch_handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    let ticker = Ticker::new(store, dispatcher, config.tick_interval);
    let ticker_token = shutdown_tx.token();
    let ticker_handle = tokio::spawn(async move { ticker.run(ticker_token).await });

    // 5. JSON-RPC server
    let service = Arc::new(CampaignService::new(pipeline, Arc::new(UuidProvider)));
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            port: config.rpc_port,
            ..Default::default()
        },
        service,
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(rpc_addr = %rpc_addr, wpt_url = %config.wpt_url, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    if let Err(e) = rpc_handle.stop() {
        error!(error = ?e, "RPC server stop failed");
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = dispatch_handle.await;
        let _ = ticker_handle.await;
    })
    .await;

    info!("Shutdown complete.");
    Ok(())
}
