use thiserror::Error;

/// Errors surfaced by the scheduler triad's dependencies. Per §7's
/// propagation policy these never escape a tick: the triad's run loop
/// logs them and continues to the next cron fire.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] occasio_store::StoreError),

    #[error("directory error: {0}")]
    Directory(#[from] occasio_directory::DirectoryError),

    #[error("queue error: {0}")]
    Queue(#[from] occasio_queue::QueueError),

    #[error("cron scheduler error: {0}")]
    CronInit(#[from] tokio_cron_scheduler::JobSchedulerError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
