//! Minute Enqueue Scheduler (component F, §4.F).
//!
//! Runs every minute: promotes `SCHEDULED` rows due within the next hour
//! to `QUEUED` and publishes them to the queue transport.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use occasio_queue::QueuePayload;
use occasio_store::CasOutcome;

use crate::deps::SchedulerDeps;
use crate::error::SchedulerResult;

#[derive(Debug, Clone, Default)]
pub struct EnqueueRunStats {
    pub enqueued: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Promote every `SCHEDULED` row due in `[now, now + window)` to `QUEUED`
/// and publish it (§4.F algorithm). Rows are processed in ascending
/// `scheduled_send_time` (§5 ordering guarantee).
pub async fn run_minute_enqueue(
    deps: &SchedulerDeps,
    now: DateTime<Utc>,
    window: ChronoDuration,
) -> SchedulerResult<EnqueueRunStats> {
    let mut stats = EnqueueRunStats::default();
    let rows = deps.store.find_due_for_enqueue(now, now + window).await?;

    for row in rows {
        match deps.store.promote_to_queued(row.id).await? {
            CasOutcome::Stale => {
                // Another scheduler tick or the recovery loop already
                // claimed this row (§7 "Stale-state": consumed silently).
                stats.skipped += 1;
                continue;
            }
            CasOutcome::Applied(queued) => {
                let payload = QueuePayload {
                    message_id: queued.id,
                    user_id: queued.user_id,
                    message_type: queued.message_type,
                    scheduled_send_time: queued.scheduled_send_time,
                    retry_count: queued.retry_count,
                };

                if let Err(err) = deps.queue.publish(&payload).await {
                    tracing::warn!(
                        message_id = %row.id,
                        error = %err,
                        "publish failed, reverting row to SCHEDULED"
                    );
                    // Compensating transition (§4.F step 2b): this row
                    // will be retried on the next tick.
                    let _ = deps.store.revert_to_scheduled(row.id).await?;
                    stats.failed += 1;
                    continue;
                }
                stats.enqueued += 1;
            }
        }
    }

    tracing::info!(
        enqueued = stats.enqueued,
        skipped = stats.skipped,
        failed = stats.failed,
        "minute enqueue run complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use occasio_core::{MessageLogId, MessageStatus, MessageType, UserId};
    use occasio_directory::InMemoryUserDirectory;
    use occasio_queue::InMemoryQueueTransport;
    use occasio_store::{MessageLogStore, NewScheduledMessage};
    use sqlx::PgPool;
    use std::sync::Arc;

    async fn seed(deps: &SchedulerDeps, send_time: DateTime<Utc>, key: &str) -> MessageLogId {
        let id = MessageLogId::new();
        deps.store
            .insert_scheduled(NewScheduledMessage {
                id,
                user_id: UserId::new(),
                message_type: MessageType::Birthday,
                message_content: "hi".to_string(),
                scheduled_send_time: send_time,
                idempotency_key: key.to_string(),
            })
            .await
            .unwrap();
        id
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_promotes_and_publishes_due_rows(pool: PgPool) -> sqlx::Result<()> {
        let queue = Arc::new(InMemoryQueueTransport::new());
        let deps = SchedulerDeps {
            store: MessageLogStore::new(pool.clone()),
            directory: Arc::new(InMemoryUserDirectory::new()),
            queue: queue.clone(),
        };

        let now = Utc::now();
        let id = seed(&deps, now + ChronoDuration::minutes(10), "a:BIRTHDAY:2025-05-10").await;

        let stats = run_minute_enqueue(&deps, now, ChronoDuration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.failed, 0);

        let row = deps.store.by_id(id).await.unwrap().unwrap();
        assert_eq!(row.status, MessageStatus::Queued);

        let mut consumer = queue.consume(1).await.unwrap();
        let delivery = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload.message_id, id);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_rows_outside_window_are_not_enqueued(pool: PgPool) -> sqlx::Result<()> {
        let deps = SchedulerDeps {
            store: MessageLogStore::new(pool.clone()),
            directory: Arc::new(InMemoryUserDirectory::new()),
            queue: Arc::new(InMemoryQueueTransport::new()),
        };

        let now = Utc::now();
        seed(&deps, now + ChronoDuration::hours(3), "a:BIRTHDAY:2025-05-10").await;

        let stats = run_minute_enqueue(&deps, now, ChronoDuration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.enqueued, 0);
        Ok(())
    }
}
