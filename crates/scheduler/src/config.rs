//! Configuration for the scheduler triad (E, F, G) — §6's enumerated
//! configuration table, the rows owned by this crate.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cron for the Daily Precalculation Scheduler (E). Default midnight
    /// UTC: `0 0 * * *`.
    pub daily_cron: String,
    /// Cron for the Minute Enqueue Scheduler (F). Default every minute.
    pub minute_cron: String,
    /// Cron for the Recovery Scheduler (G). Default every 10 minutes.
    pub recovery_cron: String,

    /// Forward window (E) over which occasions are precalculated, in days.
    pub horizon_days: i64,
    /// Forward window (F) within which SCHEDULED rows are promoted.
    pub enqueue_window: Duration,

    /// Recovery grace (G): how far scheduled_send_time must be in the
    /// past before a SCHEDULED/QUEUED/RETRYING row counts as stranded.
    pub stranded_grace: Duration,
    /// How long a QUEUED/RETRYING row must sit unclaimed before G
    /// re-publishes it.
    pub queued_retrying_stale_after: Duration,
    /// How long a SENDING row may sit before G assumes the worker that
    /// claimed it crashed.
    pub worker_timeout: Duration,
    /// Lateness past which G gives up and marks a row FAILED outright,
    /// regardless of retry budget.
    pub stranded_hard_lateness: Duration,
    /// Retry budget enforced by G, independent of the worker's own
    /// `max_worker_retries` (§6: "Max recovery retries").
    pub max_recovery_retries: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_cron: "0 0 * * *".to_string(),
            minute_cron: "* * * * *".to_string(),
            recovery_cron: "*/10 * * * *".to_string(),
            horizon_days: 1,
            enqueue_window: Duration::from_secs(3600),
            stranded_grace: Duration::from_secs(5 * 60),
            queued_retrying_stale_after: Duration::from_secs(15 * 60),
            worker_timeout: Duration::from_secs(2 * 60),
            stranded_hard_lateness: Duration::from_secs(24 * 60 * 60),
            max_recovery_retries: 3,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            daily_cron: env_or(default.daily_cron, "SCHEDULER_DAILY_CRON"),
            minute_cron: env_or(default.minute_cron, "SCHEDULER_MINUTE_CRON"),
            recovery_cron: env_or(default.recovery_cron, "SCHEDULER_RECOVERY_CRON"),
            horizon_days: env_parse("SCHEDULER_HORIZON_DAYS", default.horizon_days)?,
            enqueue_window: env_parse_secs("SCHEDULER_ENQUEUE_WINDOW_SECS", default.enqueue_window)?,
            stranded_grace: env_parse_secs("SCHEDULER_STRANDED_GRACE_SECS", default.stranded_grace)?,
            queued_retrying_stale_after: env_parse_secs(
                "SCHEDULER_QUEUED_STALE_AFTER_SECS",
                default.queued_retrying_stale_after,
            )?,
            worker_timeout: env_parse_secs("SCHEDULER_WORKER_TIMEOUT_SECS", default.worker_timeout)?,
            stranded_hard_lateness: env_parse_secs(
                "SCHEDULER_HARD_LATENESS_SECS",
                default.stranded_hard_lateness,
            )?,
            max_recovery_retries: env_parse("SCHEDULER_MAX_RECOVERY_RETRIES", default.max_recovery_retries)?,
        })
    }
}

fn env_or(default: String, key: &str) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}"))
            .context(format!("parsing {key}")),
    }
}

fn env_parse_secs(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let secs: u64 = raw.parse().context(format!("parsing {key}"))?;
            Ok(Duration::from_secs(secs))
        }
    }
}
