//! Worker pool tuning (§6's enumerated configuration table, the rows
//! owned by this crate).

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Fixed pool size, default 5 (§4.H).
    pub concurrency: u16,
    /// Retry budget before dead-lettering (H step 9).
    pub max_worker_retries: i32,
    pub backoff_base: Duration,
    pub backoff_factor: u32,
    pub backoff_cap: Duration,
    /// Drain window on shutdown: in-flight messages get this long to
    /// finish before the pool hard-stops (§5).
    pub drain_window: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_worker_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_factor: 2,
            backoff_cap: Duration::from_secs(10),
            drain_window: Duration::from_secs(10),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            concurrency: env_parse("WORKER_CONCURRENCY", default.concurrency)?,
            max_worker_retries: env_parse("WORKER_MAX_RETRIES", default.max_worker_retries)?,
            backoff_base: env_parse_secs("WORKER_BACKOFF_BASE_SECS", default.backoff_base)?,
            backoff_factor: env_parse("WORKER_BACKOFF_FACTOR", default.backoff_factor)?,
            backoff_cap: env_parse_secs("WORKER_BACKOFF_CAP_SECS", default.backoff_cap)?,
            drain_window: env_parse_secs("WORKER_DRAIN_WINDOW_SECS", default.drain_window)?,
        })
    }
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
