//! Daily Precalculation Scheduler (component E, §4.E).
//!
//! Runs once per UTC day (cron `0 0 * * *`) and on demand: materializes
//! `SCHEDULED` rows for every occasion due within the forward horizon.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};

use occasio_core::{
    idempotency_key, occasion_date_in_year, parse_timezone, render_message_content,
    scheduled_send_time, MessageLogId, MessageType,
};
use occasio_store::{InsertOutcome, NewScheduledMessage};

use crate::deps::SchedulerDeps;
use crate::error::SchedulerResult;

#[derive(Debug, Clone, Default)]
pub struct DailyRunStats {
    pub considered: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub invalid_timezone: u64,
}

/// Materialize `SCHEDULED` rows for every occasion in
/// `[now.date(), now.date() + horizon_days)` (§4.E algorithm).
///
/// Duplicate insertion signals (I1) are expected and silently folded into
/// `duplicates`; they are not propagated as errors. A user with an
/// unparseable timezone is a validation failure (§7) — it is skipped and
/// counted, never reaches the store.
pub async fn run_daily_precalculation(
    deps: &SchedulerDeps,
    horizon_days: i64,
    now: DateTime<Utc>,
) -> SchedulerResult<DailyRunStats> {
    let mut stats = DailyRunStats::default();
    let today = now.date_naive();

    for offset in 0..horizon_days {
        let date = today + ChronoDuration::days(offset);

        // A Feb 29 occasion collapses onto Feb 28 in a non-leap year
        // (§4.D). Calendar iteration never produces a Feb 29 date that
        // year, so Feb 28 must also pull in raw Feb 29 occasions or they
        // would never be matched.
        let mut occasion_keys = vec![(date.month(), date.day())];
        if date.month() == 2
            && date.day() == 28
            && NaiveDate::from_ymd_opt(date.year(), 2, 29).is_none()
        {
            occasion_keys.push((2, 29));
        }

        for message_type in MessageType::ALL {
            let mut users = Vec::new();
            for &(month, day) in &occasion_keys {
                users.extend(
                    deps.directory
                        .with_occasion_on(month, day, message_type)
                        .await?,
                );
            }

            for user in users {
                stats.considered += 1;
                let Some(raw_date) = user.occasion_date(message_type) else {
                    continue;
                };
                let Ok(tz) = parse_timezone(&user.timezone) else {
                    stats.invalid_timezone += 1;
                    tracing::warn!(
                        user_id = %user.id,
                        timezone = %user.timezone,
                        "skipping occasion: invalid timezone"
                    );
                    continue;
                };

                let local_date = occasion_date_in_year(raw_date, date.year());
                let send_time = scheduled_send_time(raw_date, date.year(), tz);
                let key = idempotency_key(user.id, message_type, local_date);

                let row = NewScheduledMessage {
                    id: MessageLogId::new(),
                    user_id: user.id,
                    message_type,
                    message_content: render_message_content(message_type, &user),
                    scheduled_send_time: send_time,
                    idempotency_key: key,
                };

                match deps.store.insert_scheduled(row).await? {
                    InsertOutcome::Inserted(_) => stats.inserted += 1,
                    InsertOutcome::Duplicate => stats.duplicates += 1,
                }
            }
        }
    }

    tracing::info!(
        considered = stats.considered,
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        invalid_timezone = stats.invalid_timezone,
        "daily precalculation run complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use occasio_core::{MessageStatus, User, UserId};
    use occasio_directory::InMemoryUserDirectory;
    use occasio_queue::InMemoryQueueTransport;
    use occasio_store::MessageLogStore;
    use sqlx::PgPool;
    use std::sync::Arc;

    fn user(tz: &str, birthday: NaiveDate) -> User {
        User {
            id: UserId::new(),
            email: "a@example.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            timezone: tz.to_string(),
            birthday_date: Some(birthday),
            anniversary_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_two_users_two_zones_same_date(pool: PgPool) -> sqlx::Result<()> {
        // Spec worked example 1: Alice (Europe/London) and Bob (Asia/Tokyo),
        // both born 05-10, precalculated at 2025-05-10T00:00Z.
        let directory = Arc::new(InMemoryUserDirectory::new());
        let alice = user(
            "Europe/London",
            NaiveDate::from_ymd_opt(1990, 5, 10).unwrap(),
        );
        let bob = user("Asia/Tokyo", NaiveDate::from_ymd_opt(1985, 5, 10).unwrap());
        directory.insert(alice.clone());
        directory.insert(bob.clone());

        let deps = SchedulerDeps {
            store: MessageLogStore::new(pool.clone()),
            directory: directory.clone(),
            queue: Arc::new(InMemoryQueueTransport::new()),
        };

        let run_at = Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap();
        let stats = run_daily_precalculation(&deps, 1, run_at).await.unwrap();
        assert_eq!(stats.inserted, 2);

        let due = deps
            .store
            .find_due_for_enqueue(run_at, run_at + ChronoDuration::days(2))
            .await
            .unwrap();
        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|r| r.status == MessageStatus::Scheduled));

        let alice_row = due.iter().find(|r| r.user_id == alice.id).unwrap();
        assert_eq!(
            alice_row.scheduled_send_time,
            Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap()
        );
        let bob_row = due.iter().find(|r| r.user_id == bob.id).unwrap();
        assert_eq!(
            bob_row.scheduled_send_time,
            Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap()
        );
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_running_twice_in_one_day_is_idempotent(pool: PgPool) -> sqlx::Result<()> {
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.insert(user(
            "Europe/London",
            NaiveDate::from_ymd_opt(1990, 5, 10).unwrap(),
        ));

        let deps = SchedulerDeps {
            store: MessageLogStore::new(pool.clone()),
            directory,
            queue: Arc::new(InMemoryQueueTransport::new()),
        };

        let run_at = Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap();
        let first = run_daily_precalculation(&deps, 1, run_at).await.unwrap();
        let second = run_daily_precalculation(&deps, 1, run_at).await.unwrap();

        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 1);

        let due = deps
            .store
            .find_due_for_enqueue(run_at, run_at + ChronoDuration::days(2))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_feb_29_birthday_schedules_feb_28_in_non_leap_year(pool: PgPool) -> sqlx::Result<()> {
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.insert(user("UTC", NaiveDate::from_ymd_opt(1992, 2, 29).unwrap()));

        let deps = SchedulerDeps {
            store: MessageLogStore::new(pool.clone()),
            directory,
            queue: Arc::new(InMemoryQueueTransport::new()),
        };

        let run_at = Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap();
        let stats = run_daily_precalculation(&deps, 1, run_at).await.unwrap();
        assert_eq!(stats.inserted, 1);
        Ok(())
    }
}
