//! Recovery Scheduler (component G, §4.G).
//!
//! Runs every ten minutes and repairs rows the enqueue scheduler or a
//! worker left behind: a missed `SCHEDULED` row, a `QUEUED`/`RETRYING`
//! row nobody has claimed, or a `SENDING` row whose worker crashed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use occasio_core::{MessageLog, MessageStatus};
use occasio_queue::QueuePayload;
use occasio_store::CasOutcome;

use crate::config::SchedulerConfig;
use crate::deps::SchedulerDeps;
use crate::error::SchedulerResult;

#[derive(Debug, Clone, Default)]
pub struct RecoveryRunStats {
    pub inspected: u64,
    pub republished: u64,
    pub failed_hard_lateness: u64,
    pub failed_retry_budget: u64,
    pub untouched: u64,
}

/// Repair stranded rows (§4.G algorithm). `now` is threaded through
/// rather than read from the clock so tests are deterministic.
pub async fn run_recovery(
    deps: &SchedulerDeps,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> SchedulerResult<RecoveryRunStats> {
    let mut stats = RecoveryRunStats::default();

    let grace = ChronoDuration::from_std(config.stranded_grace).unwrap_or_default();
    let worker_timeout = ChronoDuration::from_std(config.worker_timeout).unwrap_or_default();

    let mut rows = deps.store.find_stranded(now - grace).await?;
    rows.extend(deps.store.find_stranded_sending(now - worker_timeout).await?);

    for row in rows {
        stats.inspected += 1;

        if exceeds_hard_lateness(&row, now, config) {
            deps.store
                .mark_failed(
                    row.id,
                    &[
                        MessageStatus::Scheduled,
                        MessageStatus::Queued,
                        MessageStatus::Retrying,
                        MessageStatus::Sending,
                    ],
                    "stale: exceeded stranded hard lateness bound",
                )
                .await?;
            stats.failed_hard_lateness += 1;
            continue;
        }

        if row.retry_count >= config.max_recovery_retries {
            deps.store
                .mark_failed(
                    row.id,
                    &[
                        MessageStatus::Scheduled,
                        MessageStatus::Queued,
                        MessageStatus::Retrying,
                        MessageStatus::Sending,
                    ],
                    "stale: exceeded max recovery retries",
                )
                .await?;
            stats.failed_retry_budget += 1;
            continue;
        }

        let republished = match row.status {
            MessageStatus::Scheduled => recover_scheduled(deps, &row).await?,
            MessageStatus::Queued | MessageStatus::Retrying => {
                recover_queued_or_retrying(deps, &row, now, config).await?
            }
            MessageStatus::Sending => recover_sending(deps, &row).await?,
            MessageStatus::Sent | MessageStatus::Failed => false,
        };

        if republished {
            stats.republished += 1;
        } else {
            stats.untouched += 1;
        }
    }

    tracing::info!(
        inspected = stats.inspected,
        republished = stats.republished,
        failed_hard_lateness = stats.failed_hard_lateness,
        failed_retry_budget = stats.failed_retry_budget,
        untouched = stats.untouched,
        "recovery run complete"
    );

    Ok(stats)
}

fn exceeds_hard_lateness(row: &MessageLog, now: DateTime<Utc>, config: &SchedulerConfig) -> bool {
    let hard_lateness = ChronoDuration::from_std(config.stranded_hard_lateness).unwrap_or_default();
    now - row.scheduled_send_time > hard_lateness
}

async fn publish(deps: &SchedulerDeps, row: &MessageLog) -> SchedulerResult<bool> {
    let payload = QueuePayload {
        message_id: row.id,
        user_id: row.user_id,
        message_type: row.message_type,
        scheduled_send_time: row.scheduled_send_time,
        retry_count: row.retry_count,
    };
    match deps.queue.publish(&payload).await {
        Ok(()) => Ok(true),
        Err(err) => {
            tracing::warn!(message_id = %row.id, error = %err, "recovery publish failed");
            Ok(false)
        }
    }
}

async fn recover_scheduled(deps: &SchedulerDeps, row: &MessageLog) -> SchedulerResult<bool> {
    match deps.store.promote_to_queued(row.id).await? {
        CasOutcome::Stale => Ok(false),
        CasOutcome::Applied(queued) => {
            if publish(deps, &queued).await? {
                Ok(true)
            } else {
                deps.store.revert_to_scheduled(row.id).await?;
                Ok(false)
            }
        }
    }
}

async fn recover_queued_or_retrying(
    deps: &SchedulerDeps,
    row: &MessageLog,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> SchedulerResult<bool> {
    let stale_after =
        ChronoDuration::from_std(config.queued_retrying_stale_after).unwrap_or_default();
    let sitting_since = row.last_retry_at.unwrap_or(row.created_at);
    if now - sitting_since < stale_after {
        return Ok(false);
    }
    publish(deps, row).await
}

async fn recover_sending(deps: &SchedulerDeps, row: &MessageLog) -> SchedulerResult<bool> {
    match deps.store.requeue_stranded_sending(row.id).await? {
        CasOutcome::Stale => Ok(false),
        CasOutcome::Applied(requeued) => publish(deps, &requeued).await,
    }
}
