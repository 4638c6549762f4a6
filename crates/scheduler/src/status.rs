//! Per-scheduler run reporting (§4.E/F/G Shared Concurrency Contract:
//! "report last-run-time, last-run-duration, last-run-outcome").

use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Success,
    /// Skipped because a prior invocation was still running.
    SkippedOverlap,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_duration: Option<Duration>,
    pub last_outcome: Option<RunOutcomeKind>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcomeKind {
    Success,
    SkippedOverlap,
    Failed,
}

impl RunReport {
    fn record(&mut self, started_at: DateTime<Utc>, duration: Duration, outcome: RunOutcome) {
        self.last_run_at = Some(started_at);
        self.last_run_duration = Some(duration);
        match outcome {
            RunOutcome::Success => {
                self.last_outcome = Some(RunOutcomeKind::Success);
                self.last_error = None;
            }
            RunOutcome::SkippedOverlap => {
                self.last_outcome = Some(RunOutcomeKind::SkippedOverlap);
            }
            RunOutcome::Failed(message) => {
                self.last_outcome = Some(RunOutcomeKind::Failed);
                self.last_error = Some(message);
            }
        }
    }
}

/// Observability surface for the scheduler triad: one `RunReport` per job,
/// guarded independently so a reader never blocks a writer across jobs.
#[derive(Default)]
pub struct SchedulerStatus {
    daily: RwLock<RunReport>,
    enqueue: RwLock<RunReport>,
    recovery: RwLock<RunReport>,
}

impl SchedulerStatus {
    pub fn record_daily(&self, started_at: DateTime<Utc>, duration: Duration, outcome: RunOutcome) {
        self.daily.write().unwrap().record(started_at, duration, outcome);
    }

    pub fn record_enqueue(&self, started_at: DateTime<Utc>, duration: Duration, outcome: RunOutcome) {
        self.enqueue.write().unwrap().record(started_at, duration, outcome);
    }

    pub fn record_recovery(&self, started_at: DateTime<Utc>, duration: Duration, outcome: RunOutcome) {
        self.recovery.write().unwrap().record(started_at, duration, outcome);
    }

    pub fn daily(&self) -> RunReport {
        self.daily.read().unwrap().clone()
    }

    pub fn enqueue(&self) -> RunReport {
        self.enqueue.read().unwrap().clone()
    }

    pub fn recovery(&self) -> RunReport {
        self.recovery.read().unwrap().clone()
    }
}
