//! Periodic maintenance jobs on tokio-cron-scheduler.

use std::future::Future;
use std::sync::Arc;

use gatekeep_infra::LocalFixedWindowLimiter;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

/// Owns the cron runtime. Jobs stop when this is dropped or shut down.
pub struct Scheduler {
    jobs: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self, JobSchedulerError> {
        Ok(Self {
            jobs: JobScheduler::new().await?,
        })
    }

    /// Run `task` on `cron`, a six-field expression with seconds first.
    pub async fn every<F, Fut>(
        &self,
        name: &'static str,
        cron: &str,
        task: F,
    ) -> Result<Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(cron, move |_id, _scheduler| {
            let run = task.clone();
            Box::pin(async move { run().await })
        })?;
        let id = self.jobs.add(job).await?;
        tracing::info!(job = name, cron, %id, "Scheduled background job");
        Ok(id)
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        self.jobs.start().await
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.jobs.shutdown().await
    }
}

/// Register the job that evicts expired windows from the in-process limiter.
pub async fn schedule_limiter_sweep(
    scheduler: &Scheduler,
    limiter: Arc<LocalFixedWindowLimiter>,
    cron: &str,
) -> Result<Uuid, JobSchedulerError> {
    scheduler
        .every("limiter-sweep", cron, move || {
            let limiter = limiter.clone();
            async move {
                let removed = limiter.sweep();
                tracing::debug!(removed, tracked = limiter.tracked_keys(), "Limiter sweep");
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gatekeep_core::ports::RateLimiter;
    use gatekeep_infra::RateLimitConfig;

    #[tokio::test]
    async fn test_rejects_malformed_cron() {
        let scheduler = Scheduler::new().await.unwrap();
        let result = scheduler.every("noop", "not a cron", || async {}).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sweep_job_evicts_expired_windows() {
        let limiter = Arc::new(LocalFixedWindowLimiter::new(RateLimitConfig::new(
            5,
            Duration::from_millis(100),
        )));
        limiter.allow("10.0.0.9").await.unwrap();
        assert_eq!(limiter.tracked_keys(), 1);

        let mut scheduler = Scheduler::new().await.unwrap();
        schedule_limiter_sweep(&scheduler, limiter.clone(), "* * * * * *")
            .await
            .unwrap();
        scheduler.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.shutdown().await.unwrap();

        assert_eq!(limiter.tracked_keys(), 0);
    }
}
