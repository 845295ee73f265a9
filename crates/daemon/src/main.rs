//! SalonQ Daemon - Main Entry Point
//! JSON-RPC server + nightly reset scheduler

mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use settings::{DaemonConfig, LogFormat};
use salonq_api_rpc::throttle::MutationThrottle;
use salonq_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use salonq_core::application::{
    shutdown_channel, DailySchedule, DirectoryService, FanOut, QueueService, ResetScheduler,
};
use salonq_core::port::id_provider::UuidProvider;
use salonq_core::port::time_provider::SystemTimeProvider;
use salonq_infra_sqlite::{
    create_pool, database_url, run_migrations, SqliteQueueMaintenance, SqliteQueueStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE_PREFIX: &str = "salonq-daemon.log";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::load()?;

    // 2. Initialize logging (guard flushes the file writer on exit)
    let _log_guard = init_logging(&config)?;
    info!("SalonQ daemon v{} starting...", VERSION);

    let schedule: DailySchedule = config
        .reset_at
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // 3. Initialize database
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path.display(), "Initializing database...");

    let pool = create_pool(&database_url(&db_path))
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let maintenance = Arc::new(SqliteQueueMaintenance::new(&store));

    let fanout = FanOut::new(store.clone(), config.room_capacity);
    let queue = Arc::new(QueueService::new(
        store.clone(),
        id_provider.clone(),
        time_provider.clone(),
        Arc::new(fanout.clone()),
    ));
    let directory = Arc::new(DirectoryService::new(
        store.clone(),
        id_provider,
        time_provider,
    ));
    let reset = Arc::new(ResetScheduler::new(
        maintenance.clone(),
        Arc::new(fanout.clone()),
        schedule,
    ));

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = RpcHandler::new(
        queue,
        directory,
        fanout,
        maintenance,
        reset.clone(),
        MutationThrottle::new(config.rate_limit_burst, config.rate_limit_rate),
    );
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start nightly reset scheduler
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let reset_handle = tokio::spawn(reset.run(shutdown_rx));

    info!(addr = %addr, reset_at = %schedule, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reset_handle).await;
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}

fn init_logging(config: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("salonq=info"))
        .context("Failed to create env filter")?;

    // Log files are always JSON
    let (file_layer, guard) = match config.log_path() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    match config.log_format {
        // Production: JSON structured logging
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }

    Ok(guard)
}
