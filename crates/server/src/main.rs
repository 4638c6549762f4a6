use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use occasio_directory::PgUserDirectory;
use occasio_queue::LapinQueueTransport;
use occasio_scheduler::{SchedulerDeps, SchedulerTriad};
use occasio_shared::{init_db, init_env, init_tracing, wait_for_signal};
use occasio_store::MessageLogStore;
use occasio_vendor::ReqwestVendorClient;
use occasio_worker::WorkerDeps;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    init_env();

    let config = config::UnifiedConfig::from_env()?;
    let _guard = init_tracing("occasio", config.core.enable_file_logging);

    tracing::info!("starting occasio unified server");

    let pool = init_db(&config.core).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("migrations complete");

    let store = MessageLogStore::new(pool.clone());
    let directory: Arc<dyn occasio_directory::UserDirectory> =
        Arc::new(PgUserDirectory::new(pool.clone()));
    let queue = LapinQueueTransport::connect(&config.core.amqp_url).await?;
    let queue: Arc<dyn occasio_queue::QueueTransport> = Arc::new(queue);
    let vendor: Arc<dyn occasio_vendor::VendorClient> =
        Arc::new(ReqwestVendorClient::new(&config.core.vendor_url)?);

    let shutdown = CancellationToken::new();

    let scheduler_deps = SchedulerDeps {
        store: store.clone(),
        directory: directory.clone(),
        queue: queue.clone(),
    };
    let triad = SchedulerTriad::start(scheduler_deps, config.scheduler.clone()).await?;
    tracing::info!("scheduler triad started");

    let worker_deps = WorkerDeps {
        store,
        directory,
        queue,
        vendor,
    };
    let worker_shutdown = shutdown.clone();
    let worker_config = config.worker.clone();
    let worker_handle = tokio::spawn(async move {
        occasio_worker::run_worker_pool(worker_deps, worker_config, worker_shutdown).await
    });
    tracing::info!("worker pool started");

    wait_for_signal().await;
    tracing::info!("shutdown signal received, draining");

    shutdown.cancel();
    let _ = worker_handle.await;
    triad.shutdown().await?;

    tracing::info!("occasio unified server stopped");
    Ok(())
}
