use std::sync::Arc;

use bson::DateTime;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};
use worknest_config::SweepSettings;

use crate::error::ServiceResult;
use crate::task::TaskLifecycle;

/// Periodically promotes late tasks to `overdue`.
pub struct OverdueSweep {
    tasks: Arc<TaskLifecycle>,
}

impl OverdueSweep {
    pub fn new(tasks: Arc<TaskLifecycle>) -> Self {
        Self { tasks }
    }

    pub async fn run_once(&self) -> ServiceResult<u64> {
        let marked = self.tasks.sweep(DateTime::now()).await?;
        info!(marked, "Overdue sweep finished");
        Ok(marked)
    }

    /// Registers the sweep on a cron scheduler and starts it. Returns `None`
    /// when the sweep is disabled.
    pub async fn schedule(
        self: Arc<Self>,
        settings: &SweepSettings,
    ) -> Result<Option<JobScheduler>, JobSchedulerError> {
        if !settings.enabled {
            info!("Overdue sweep disabled");
            return Ok(None);
        }

        let scheduler = JobScheduler::new().await?;
        let job = Job::new_async(settings.cron.as_str(), move |_uuid, _lock| {
            let sweep = self.clone();
            Box::pin(async move {
                if let Err(e) = sweep.run_once().await {
                    error!(%e, "Overdue sweep failed");
                }
            })
        })?;
        scheduler.add(job).await?;
        scheduler.start().await?;

        info!(cron = %settings.cron, "Overdue sweep scheduled");
        Ok(Some(scheduler))
    }
}
