//! occasio-worker - The bounded worker pool dispatching queued messages
//! to the vendor (component H, §4.H).
//!
//! `concurrency` tokio tasks share one `mpsc` channel fed by a single
//! queue-consuming fetch task — the same fetch-then-spawn shape as the
//! teacher's worker loop, generalized from polling a table to draining a
//! push-based queue consumer.

pub mod backoff;
pub mod config;
mod error;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use occasio_core::MessageStatus;
use occasio_directory::UserDirectory;
use occasio_queue::{QueueDelivery, QueuePayload, QueueTransport};
use occasio_store::{CasOutcome, MessageLogStore};
use occasio_vendor::{SendOutcome, VendorClient, VendorError};

/// Process-wide handles the worker pool reads and writes, mirroring
/// [`occasio_scheduler::SchedulerDeps`] (§5 AMBIENT).
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: MessageLogStore,
    pub directory: Arc<dyn UserDirectory>,
    pub queue: Arc<dyn QueueTransport>,
    pub vendor: Arc<dyn VendorClient>,
}

/// Run the worker pool until `shutdown` fires, then drain in-flight
/// messages for `config.drain_window` before returning (§5).
pub async fn run_worker_pool(
    deps: WorkerDeps,
    config: WorkerConfig,
    shutdown: CancellationToken,
) -> WorkerResult<()> {
    let mut consumer = deps.queue.consume(config.concurrency).await?;
    let (tx, rx) = mpsc::channel::<QueueDelivery>(config.concurrency as usize);
    let rx = Arc::new(Mutex::new(rx));

    let fetch_shutdown = shutdown.clone();
    let fetch_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = fetch_shutdown.cancelled() => {
                    info!("worker pool: fetch loop stopping, shutdown requested");
                    break;
                }
                next = consumer.next() => {
                    match next {
                        Ok(Some(delivery)) => {
                            if tx.send(delivery).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            error!(error = %err, "worker pool: queue consumer error");
                            break;
                        }
                    }
                }
            }
        }
    });

    info!(concurrency = config.concurrency, "worker pool started");

    let mut workers = tokio::task::JoinSet::new();
    for _ in 0..config.concurrency {
        let deps = deps.clone();
        let config = config.clone();
        let rx = rx.clone();
        workers.spawn(async move {
            loop {
                let delivery = rx.lock().await.recv().await;
                let Some(delivery) = delivery else { break };
                process_delivery(&deps, &config, delivery).await;
            }
        });
    }

    shutdown.cancelled().await;
    info!("worker pool draining in-flight messages");

    if tokio::time::timeout(config.drain_window, async {
        while workers.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("worker pool: drain window elapsed, abandoning remaining tasks");
    }

    workers.shutdown().await;
    fetch_task.abort();
    Ok(())
}

/// Per-message protocol (§4.H steps 1-10). Never returns an error: every
/// failure path resolves to an `ack`/`nack` plus a logged warning, so one
/// bad message never takes down the pool.
async fn process_delivery(deps: &WorkerDeps, config: &WorkerConfig, delivery: QueueDelivery) {
    let message_id = delivery.payload.message_id;

    let row = match deps.store.by_id(message_id).await {
        Ok(row) => row,
        Err(err) => {
            error!(message_id = %message_id, error = %err, "failed to read message row");
            return;
        }
    };

    let Some(row) = row else {
        // Step 2: row hard-deleted by an operator.
        info!(message_id = %message_id, "message row gone, acking stale delivery");
        let _ = delivery.ack().await;
        return;
    };

    if row.status == MessageStatus::Sent {
        // Step 3 (I2): idempotent skip.
        let _ = delivery.ack().await;
        return;
    }

    if !matches!(row.status, MessageStatus::Queued | MessageStatus::Retrying) {
        // Step 4: stale payload, some other actor already moved this row on.
        warn!(message_id = %message_id, status = ?row.status, "stale payload, acking");
        let _ = delivery.ack().await;
        return;
    }

    let claimed = match deps.store.claim_for_send(message_id, row.status).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(message_id = %message_id, error = %err, "claim failed");
            return;
        }
    };
    let CasOutcome::Applied(sending) = claimed else {
        // Step 5: another worker raced in first.
        let _ = delivery.ack().await;
        return;
    };

    let user = match deps.directory.by_id(sending.user_id).await {
        Ok(user) => user,
        Err(err) => {
            error!(message_id = %message_id, error = %err, "directory lookup failed");
            return;
        }
    };

    let Some(user) = user else {
        // Step 6: user absent or soft-deleted.
        let _ = deps
            .store
            .mark_failed(message_id, &[MessageStatus::Sending], "user gone")
            .await;
        let _ = delivery.ack().await;
        return;
    };

    match deps.vendor.send(&user.email, &sending.message_content).await {
        Ok(SendOutcome::Accepted(response)) => {
            // Step 8.
            let _ = deps
                .store
                .mark_sent(message_id, i32::from(response.status), &response.body)
                .await;
            let _ = delivery.ack().await;
        }
        Ok(SendOutcome::Rejected(response)) => {
            // Step 10: non-retryable vendor rejection.
            let reason = format!("vendor rejected: {} {}", response.status, response.body);
            let _ = deps
                .store
                .mark_failed(message_id, &[MessageStatus::Sending], &reason)
                .await;
            let _ = delivery.ack().await;
        }
        Err(err) => handle_vendor_error(deps, config, &delivery, message_id, err).await,
    }
}

/// Step 9: a retryable vendor failure. `mark_retry` increments
/// `retry_count`; once it exceeds `max_worker_retries` the message is
/// dead-lettered instead of requeued.
async fn handle_vendor_error(
    deps: &WorkerDeps,
    config: &WorkerConfig,
    delivery: &QueueDelivery,
    message_id: occasio_core::MessageLogId,
    err: VendorError,
) {
    debug_assert!(err.is_retryable(), "VendorError is always retryable");

    let retried = deps
        .store
        .mark_retry(message_id, MessageStatus::Retrying, &err.to_string())
        .await;

    let log = match retried {
        Ok(CasOutcome::Applied(log)) => log,
        Ok(CasOutcome::Stale) => {
            warn!(message_id = %message_id, "mark_retry raced, acking delivery");
            let _ = delivery.ack().await;
            return;
        }
        Err(store_err) => {
            error!(message_id = %message_id, error = %store_err, "mark_retry failed");
            return;
        }
    };

    if log.retry_count <= config.max_worker_retries {
        // Publish the redelivery to the delayed retry queue instead of
        // sleeping in this fiber (§4.H: "implementations may publish to a
        // delayed retry queue instead of sleeping") so the backoff delay
        // never holds a worker slot or a broker prefetch credit.
        let delay = backoff::backoff_for(log.retry_count, config);
        let requeued = QueuePayload {
            message_id: log.id,
            user_id: log.user_id,
            message_type: log.message_type,
            scheduled_send_time: log.scheduled_send_time,
            retry_count: log.retry_count,
        };
        if let Err(publish_err) = deps.queue.publish_delayed(&requeued, delay).await {
            error!(message_id = %message_id, error = %publish_err, "delayed retry publish failed");
            let _ = delivery.nack_requeue().await;
            return;
        }
        let _ = delivery.ack().await;
    } else {
        warn!(message_id = %message_id, retry_count = log.retry_count, "retry budget exhausted, dead-lettering");
        let _ = delivery.nack_drop().await;
    }
}
