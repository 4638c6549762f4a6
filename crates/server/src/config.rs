use anyhow::Result;

use occasio_scheduler::SchedulerConfig;
use occasio_shared::CoreConfig;
use occasio_worker::WorkerConfig;

/// Everything every binary in this workspace needs, assembled from the
/// per-crate `Config::from_env` each component owns (§6 enumerated
/// configuration table).
#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub core: CoreConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
}

impl UnifiedConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
            worker: WorkerConfig::from_env()?,
        })
    }
}
