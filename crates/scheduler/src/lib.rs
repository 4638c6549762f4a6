//! occasio-scheduler - The Daily Precalculation (E), Minute Enqueue (F)
//! and Recovery (G) triad.
//!
//! Three [`tokio_cron_scheduler::Job`]s registered on one
//! [`tokio_cron_scheduler::JobScheduler`] (§4 Shared Concurrency
//! Contract). Each job guards itself with an `AtomicBool` so a slow tick
//! never overlaps its own successor; overlap is skipped and recorded on
//! [`SchedulerStatus`], never queued up.

pub mod config;
pub mod daily;
mod deps;
pub mod enqueue;
mod error;
pub mod recovery;
pub mod status;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};

pub use config::SchedulerConfig;
pub use deps::SchedulerDeps;
pub use error::{SchedulerError, SchedulerResult};
pub use status::{RunOutcome, RunOutcomeKind, SchedulerStatus};

/// A running scheduler triad. Dropping this without calling
/// [`SchedulerTriad::shutdown`] leaves the underlying `JobScheduler`
/// running in the background until the process exits.
pub struct SchedulerTriad {
    inner: JobScheduler,
    pub status: Arc<SchedulerStatus>,
}

impl SchedulerTriad {
    /// Build and start the triad: registers the daily, minute-enqueue and
    /// recovery jobs on their configured cron schedules and starts the
    /// underlying `JobScheduler` immediately.
    pub async fn start(deps: SchedulerDeps, config: SchedulerConfig) -> SchedulerResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(SchedulerError::CronInit)?;
        let status = Arc::new(SchedulerStatus::default());
        let config = Arc::new(config);

        scheduler
            .add(daily_job(deps.clone(), config.clone(), status.clone())?)
            .await
            .map_err(SchedulerError::CronInit)?;
        scheduler
            .add(enqueue_job(deps.clone(), config.clone(), status.clone())?)
            .await
            .map_err(SchedulerError::CronInit)?;
        scheduler
            .add(recovery_job(deps, config, status.clone())?)
            .await
            .map_err(SchedulerError::CronInit)?;

        scheduler.start().await.map_err(SchedulerError::CronInit)?;

        Ok(Self {
            inner: scheduler,
            status,
        })
    }

    pub async fn shutdown(mut self) -> SchedulerResult<()> {
        self.inner
            .shutdown()
            .await
            .map_err(SchedulerError::CronInit)
    }
}

fn daily_job(
    deps: SchedulerDeps,
    config: Arc<SchedulerConfig>,
    status: Arc<SchedulerStatus>,
) -> SchedulerResult<Job> {
    let running = Arc::new(AtomicBool::new(false));
    Job::new_async(config.daily_cron.as_str(), move |_uuid, _lock| {
        let deps = deps.clone();
        let config = config.clone();
        let status = status.clone();
        let running = running.clone();
        Box::pin(async move {
            if running.swap(true, Ordering::SeqCst) {
                status.record_daily(Utc::now(), Duration::ZERO, RunOutcome::SkippedOverlap);
                return;
            }
            let started_at = Utc::now();
            let started = Instant::now();
            let outcome = match daily::run_daily_precalculation(&deps, config.horizon_days, started_at)
                .await
            {
                Ok(_) => RunOutcome::Success,
                Err(err) => RunOutcome::Failed(err.to_string()),
            };
            status.record_daily(started_at, started.elapsed(), outcome);
            running.store(false, Ordering::SeqCst);
        })
    })
    .map_err(SchedulerError::CronInit)
}

fn enqueue_job(
    deps: SchedulerDeps,
    config: Arc<SchedulerConfig>,
    status: Arc<SchedulerStatus>,
) -> SchedulerResult<Job> {
    let running = Arc::new(AtomicBool::new(false));
    Job::new_async(config.minute_cron.as_str(), move |_uuid, _lock| {
        let deps = deps.clone();
        let config = config.clone();
        let status = status.clone();
        let running = running.clone();
        Box::pin(async move {
            if running.swap(true, Ordering::SeqCst) {
                status.record_enqueue(Utc::now(), Duration::ZERO, RunOutcome::SkippedOverlap);
                return;
            }
            let started_at = Utc::now();
            let started = Instant::now();
            let window = ChronoDuration::from_std(config.enqueue_window).unwrap_or_default();
            let outcome = match enqueue::run_minute_enqueue(&deps, started_at, window).await {
                Ok(_) => RunOutcome::Success,
                Err(err) => RunOutcome::Failed(err.to_string()),
            };
            status.record_enqueue(started_at, started.elapsed(), outcome);
            running.store(false, Ordering::SeqCst);
        })
    })
    .map_err(SchedulerError::CronInit)
}

fn recovery_job(
    deps: SchedulerDeps,
    config: Arc<SchedulerConfig>,
    status: Arc<SchedulerStatus>,
) -> SchedulerResult<Job> {
    let running = Arc::new(AtomicBool::new(false));
    Job::new_async(config.recovery_cron.as_str(), move |_uuid, _lock| {
        let deps = deps.clone();
        let config = config.clone();
        let status = status.clone();
        let running = running.clone();
        Box::pin(async move {
            if running.swap(true, Ordering::SeqCst) {
                status.record_recovery(Utc::now(), Duration::ZERO, RunOutcome::SkippedOverlap);
                return;
            }
            let started_at = Utc::now();
            let started = Instant::now();
            let outcome = match recovery::run_recovery(&deps, &config, started_at).await {
                Ok(_) => RunOutcome::Success,
                Err(err) => RunOutcome::Failed(err.to_string()),
            };
            status.record_recovery(started_at, started.elapsed(), outcome);
            running.store(false, Ordering::SeqCst);
        })
    })
    .map_err(SchedulerError::CronInit)
}
