//! Handwritten `sqlx` queries backing the Message Log Store (§4.A).

use chrono::{DateTime, Utc};
use occasio_core::{MessageLog, MessageLogId, MessageStatus, MessageType, UserId};
use sqlx::PgPool;

use crate::error::StoreResult;

/// A freshly rendered `SCHEDULED` row, ready for `insert_scheduled`.
#[derive(Debug, Clone)]
pub struct NewScheduledMessage {
    pub id: MessageLogId,
    pub user_id: UserId,
    pub message_type: MessageType,
    pub message_content: String,
    pub scheduled_send_time: DateTime<Utc>,
    pub idempotency_key: String,
}

/// Result of `insert_scheduled`: duplicate insertion is a functional
/// signal, not an error (I1).
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(MessageLog),
    Duplicate,
}

/// Result of any single-row compare-and-set. A stale CAS means another
/// actor (worker, scheduler, or the recovery loop) already transitioned
/// the row; callers treat this as a silent no-op (§7 "Stale-state").
#[derive(Debug)]
pub enum CasOutcome {
    Applied(MessageLog),
    Stale,
}

/// Database handle for the `message_logs` table.
#[derive(Clone)]
pub struct MessageLogStore {
    pool: PgPool,
}

impl MessageLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a `SCHEDULED` row. A unique-key conflict on `idempotency_key`
    /// is the expected duplicate signal (I1), not an error.
    pub async fn insert_scheduled(&self, row: NewScheduledMessage) -> StoreResult<InsertOutcome> {
        let inserted = sqlx::query_as::<_, MessageLog>(
            r#"
            INSERT INTO message_logs (
                id, user_id, message_type, message_content, scheduled_send_time,
                status, retry_count, idempotency_key, created_at
            )
            VALUES ($1, $2, $3, $4, $5, 'SCHEDULED', 0, $6, NOW())
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.message_type)
        .bind(row.message_content)
        .bind(row.scheduled_send_time)
        .bind(row.idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(log) => InsertOutcome::Inserted(log),
            None => InsertOutcome::Duplicate,
        })
    }

    /// Rows where `status = SCHEDULED` and `scheduled_send_time` falls in
    /// `[from, to)`, ordered ascending (F's per-tick window query).
    pub async fn find_due_for_enqueue(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<MessageLog>> {
        let rows = sqlx::query_as::<_, MessageLog>(
            r#"
            SELECT * FROM message_logs
            WHERE status = 'SCHEDULED'
              AND scheduled_send_time >= $1
              AND scheduled_send_time < $2
            ORDER BY scheduled_send_time ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// CAS `expected_prior -> SENDING` (worker claim, H step 5).
    ///
    /// Stamps `last_retry_at = NOW()` on the same row so `find_stranded_sending`
    /// can measure the worker-timeout bound from the moment the row actually
    /// entered SENDING rather than from its original `created_at` (which, for a
    /// normally precalculated row, can be hours before the send time and would
    /// make every in-flight send look stranded).
    pub async fn claim_for_send(
        &self,
        id: MessageLogId,
        expected_prior: MessageStatus,
    ) -> StoreResult<CasOutcome> {
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = 'SENDING',
                last_retry_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_prior)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }

    /// CAS `SCHEDULED -> QUEUED` (F's promotion, and G repairing a row F
    /// missed). Not in the §4.A operation table verbatim, but required by
    /// the CAS that §4.F/§4.G describe in prose.
    pub async fn promote_to_queued(
        &self,
        id: MessageLogId,
    ) -> StoreResult<CasOutcome> {
        self.cas_to(id, MessageStatus::Scheduled, MessageStatus::Queued, None)
            .await
    }

    /// Compensating transition `QUEUED -> SCHEDULED` when F's publish to
    /// the queue fails after the CAS succeeded (§4.F step 2b).
    pub async fn revert_to_scheduled(&self, id: MessageLogId) -> StoreResult<CasOutcome> {
        self.cas_to(id, MessageStatus::Queued, MessageStatus::Scheduled, None)
            .await
    }

    /// `SENDING -> QUEUED` with `retry_count` incremented: a worker crashed
    /// mid-flight and G's worker-timeout bound elapsed (§4.G).
    pub async fn requeue_stranded_sending(&self, id: MessageLogId) -> StoreResult<CasOutcome> {
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = 'QUEUED',
                retry_count = retry_count + 1
            WHERE id = $1 AND status = 'SENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }

    /// CAS `SENDING -> SENT`, stamping `actual_send_time` and the vendor
    /// response (I2: terminal from here).
    pub async fn mark_sent(
        &self,
        id: MessageLogId,
        api_response_code: i32,
        api_response_body: &str,
    ) -> StoreResult<CasOutcome> {
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = 'SENT',
                actual_send_time = NOW(),
                api_response_code = $2,
                api_response_body = $3
            WHERE id = $1 AND status = 'SENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(api_response_code)
        .bind(api_response_body)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }

    /// CAS `SENDING -> target` (RETRYING, or SCHEDULED per §4.A's "or
    /// SCHEDULED to allow F to pick up again"), incrementing `retry_count`
    /// and recording the error (I4).
    pub async fn mark_retry(
        &self,
        id: MessageLogId,
        target: MessageStatus,
        error_message: &str,
    ) -> StoreResult<CasOutcome> {
        debug_assert!(
            matches!(target, MessageStatus::Retrying | MessageStatus::Scheduled),
            "mark_retry only transitions into RETRYING or SCHEDULED"
        );
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = $2,
                retry_count = retry_count + 1,
                last_retry_at = NOW(),
                error_message = $3
            WHERE id = $1 AND status = 'SENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(target)
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }

    /// CAS `-> FAILED` from any of `from_statuses` (I3: terminal from
    /// here, barring out-of-scope manual reschedule).
    pub async fn mark_failed(
        &self,
        id: MessageLogId,
        from_statuses: &[MessageStatus],
        error_message: &str,
    ) -> StoreResult<CasOutcome> {
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = 'FAILED',
                error_message = $3
            WHERE id = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from_statuses)
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }

    /// Rows in `{SCHEDULED, QUEUED, RETRYING}` whose `scheduled_send_time`
    /// is older than `cutoff` — candidates for G's repair pass.
    pub async fn find_stranded(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<MessageLog>> {
        let rows = sqlx::query_as::<_, MessageLog>(
            r#"
            SELECT * FROM message_logs
            WHERE status = ANY($1)
              AND scheduled_send_time < $2
            ORDER BY scheduled_send_time ASC
            "#,
        )
        .bind(&[
            MessageStatus::Scheduled,
            MessageStatus::Queued,
            MessageStatus::Retrying,
        ][..])
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Rows stuck in `SENDING` older than `worker_timeout_cutoff`, used by
    /// G to detect a worker that crashed mid-flight.
    ///
    /// `claim_for_send` always stamps `last_retry_at` the moment a row
    /// enters SENDING, so the clock here runs from that claim, not from
    /// `created_at` (which for a normally precalculated row sits hours
    /// before the send time and would flag every in-flight send as
    /// stranded). The `COALESCE` is a defensive fallback only, for rows
    /// that somehow reached SENDING without going through `claim_for_send`.
    pub async fn find_stranded_sending(
        &self,
        worker_timeout_cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<MessageLog>> {
        let rows = sqlx::query_as::<_, MessageLog>(
            r#"
            SELECT * FROM message_logs
            WHERE status = 'SENDING'
              AND COALESCE(last_retry_at, created_at) < $1
            ORDER BY scheduled_send_time ASC
            "#,
        )
        .bind(worker_timeout_cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Authoritative re-read of a single row by id (H step 1).
    pub async fn by_id(&self, id: MessageLogId) -> StoreResult<Option<MessageLog>> {
        let row = sqlx::query_as::<_, MessageLog>("SELECT * FROM message_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn cas_to(
        &self,
        id: MessageLogId,
        expected_prior: MessageStatus,
        target: MessageStatus,
        error_message: Option<&str>,
    ) -> StoreResult<CasOutcome> {
        let row = sqlx::query_as::<_, MessageLog>(
            r#"
            UPDATE message_logs
            SET status = $3,
                error_message = COALESCE($4, error_message)
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_prior)
        .bind(target)
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(log) => CasOutcome::Applied(log),
            None => CasOutcome::Stale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_insert_scheduled_then_duplicate_is_silent(pool: PgPool) -> sqlx::Result<()> {
        let store = MessageLogStore::new(pool);
        let user_id = UserId::new();
        let row = NewScheduledMessage {
            id: MessageLogId::new(),
            user_id,
            message_type: MessageType::Birthday,
            message_content: "Hey, Alice it's your birthday!".to_string(),
            scheduled_send_time: Utc::now(),
            idempotency_key: format!("{}:BIRTHDAY:2025-05-10", user_id),
        };

        let first = store.insert_scheduled(row.clone()).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = store
            .insert_scheduled(NewScheduledMessage {
                id: MessageLogId::new(),
                ..row
            })
            .await
            .unwrap();
        assert!(matches!(second, InsertOutcome::Duplicate));
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_claim_for_send_cas_rejects_second_caller(pool: PgPool) -> sqlx::Result<()> {
        let store = MessageLogStore::new(pool);
        let user_id = UserId::new();
        let id = MessageLogId::new();
        store
            .insert_scheduled(NewScheduledMessage {
                id,
                user_id,
                message_type: MessageType::Anniversary,
                message_content: "Happy anniversary, Bob!".to_string(),
                scheduled_send_time: Utc::now(),
                idempotency_key: format!("{}:ANNIVERSARY:2025-05-10", user_id),
            })
            .await
            .unwrap();
        store.promote_to_queued(id).await.unwrap();

        let first = store
            .claim_for_send(id, MessageStatus::Queued)
            .await
            .unwrap();
        assert!(matches!(first, CasOutcome::Applied(_)));

        let second = store
            .claim_for_send(id, MessageStatus::Queued)
            .await
            .unwrap();
        assert!(matches!(second, CasOutcome::Stale));
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_mark_sent_sets_actual_send_time(pool: PgPool) -> sqlx::Result<()> {
        let store = MessageLogStore::new(pool);
        let user_id = UserId::new();
        let id = MessageLogId::new();
        store
            .insert_scheduled(NewScheduledMessage {
                id,
                user_id,
                message_type: MessageType::Birthday,
                message_content: "content".to_string(),
                scheduled_send_time: Utc::now(),
                idempotency_key: format!("{}:BIRTHDAY:2025-05-10", user_id),
            })
            .await
            .unwrap();
        store.promote_to_queued(id).await.unwrap();
        store.claim_for_send(id, MessageStatus::Queued).await.unwrap();

        let outcome = store.mark_sent(id, 202, "accepted").await.unwrap();
        match outcome {
            CasOutcome::Applied(log) => {
                assert_eq!(log.status, MessageStatus::Sent);
                assert!(log.actual_send_time.is_some());
            }
            CasOutcome::Stale => panic!("expected Applied"),
        }
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_find_due_for_enqueue_orders_ascending(pool: PgPool) -> sqlx::Result<()> {
        let store = MessageLogStore::new(pool);
        let now = Utc::now();
        let user_id = UserId::new();
        for (i, offset_min) in [30_i64, 5, 15].into_iter().enumerate() {
            store
                .insert_scheduled(NewScheduledMessage {
                    id: MessageLogId::new(),
                    user_id,
                    message_type: MessageType::Birthday,
                    message_content: "content".to_string(),
                    scheduled_send_time: now + chrono::Duration::minutes(offset_min),
                    idempotency_key: format!("{}:BIRTHDAY:2025-0{}-10", user_id, i + 1),
                })
                .await
                .unwrap();
        }

        let due = store
            .find_due_for_enqueue(now, now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(due.len(), 3);
        assert!(due[0].scheduled_send_time <= due[1].scheduled_send_time);
        assert!(due[1].scheduled_send_time <= due[2].scheduled_send_time);
        Ok(())
    }
}
