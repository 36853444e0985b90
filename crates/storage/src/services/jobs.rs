//! Materialization job lifecycle and the background worker that drains it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FilterTuple, RankingJob};
use crate::services::materializer::Materializer;
use crate::traits::JobStore;

/// How long a job may stay running before it is presumed abandoned.
pub const DEFAULT_JOB_LEASE: Duration = Duration::from_secs(15 * 60);

/// Front door for job submission and inspection.
///
/// Cloning is cheap; clones share the store and the worker wake-up signal.
#[derive(Clone)]
pub struct JobCoordinator {
    jobs: Arc<dyn JobStore>,
    wakeup: Arc<Notify>,
    lease: Duration,
}

impl JobCoordinator {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self {
            jobs,
            wakeup: Arc::new(Notify::new()),
            lease: DEFAULT_JOB_LEASE,
        }
    }

    /// Running jobs older than `lease` are failed before the next claim.
    ///
    /// Must exceed the longest expected materialization, fetch timeout included.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Records a pending job and wakes a worker. Returns without waiting for it to run.
    pub async fn submit(&self, filters: FilterTuple) -> Result<RankingJob> {
        let job = self.jobs.create(filters).await?;
        tracing::info!(job_id = %job.id, filter_key = %job.filter_key, "ranking job submitted");

        self.wakeup.notify_one();

        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<RankingJob> {
        self.jobs.get(id).await
    }

    pub async fn list(&self, limit: u32) -> Result<Vec<RankingJob>> {
        self.jobs.list(limit).await
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Runs one claimed job to a terminal state.
    ///
    /// Materialization errors are recorded on the job rather than returned; only a
    /// failure to record the outcome itself is an error.
    #[instrument(skip_all, fields(job_id = %job.id, filter_key = %job.filter_key))]
    pub async fn run_job(&self, materializer: &Materializer, job: RankingJob) -> Result<RankingJob> {
        match materializer.materialize_job(&job.filters).await {
            Ok(total) => {
                let total_records = i32::try_from(total).unwrap_or(i32::MAX);
                let done = self.jobs.complete(job.id, total_records).await?;
                tracing::info!(total_records, "ranking job completed");
                Ok(done)
            }
            Err(e) => {
                tracing::error!(error = %e, "ranking job failed");
                self.jobs.fail(job.id, &e.to_string()).await
            }
        }
    }

    /// Fails running jobs whose lease ran out. Returns the jobs it failed.
    pub async fn expire_stale(&self, lease: Duration) -> Result<Vec<RankingJob>> {
        let expired = self.jobs.expire_running(lease).await?;
        for job in &expired {
            tracing::warn!(
                job_id = %job.id,
                filter_key = %job.filter_key,
                started_at = ?job.started_at,
                "ranking job lease expired, marked failed"
            );
        }

        Ok(expired)
    }

    /// Claims and runs pending jobs until none are claimable. Returns how many ran.
    ///
    /// Abandoned running jobs are expired first so they cannot block their tuple.
    pub async fn run_pending(&self, materializer: &Materializer) -> Result<usize> {
        self.expire_stale(self.lease).await?;

        let mut processed = 0;

        while let Some(job) = self.jobs.claim_next().await? {
            self.run_job(materializer, job).await?;
            processed += 1;
        }

        Ok(processed)
    }
}

/// A long-running task that drains the job queue.
pub struct JobWorker {
    id: usize,
    coordinator: JobCoordinator,
    materializer: Materializer,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(
        id: usize,
        coordinator: JobCoordinator,
        materializer: Materializer,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            coordinator,
            materializer,
            poll_interval,
        }
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Wakes on submission or every `poll_interval`, whichever comes first, so jobs
    /// submitted by another process are picked up too.
    #[instrument(skip_all, fields(worker = self.id))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("job worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.coordinator.run_pending(&self.materializer).await {
                Ok(0) => {}
                Ok(processed) => tracing::debug!(processed, "drained job queue"),
                Err(e) => tracing::error!(error = %e, "job worker could not drain the queue"),
            }

            tokio::select! {
                _ = self.coordinator.wakeup.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("job worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::memory::{MemoryCacheStore, MemoryJobStore, MemoryRecordSource};
    use crate::models::JobStatus;

    fn filter() -> FilterTuple {
        FilterTuple::from_parts("Breast", 100, "LCM", "M", "13-14", "all", "all", "2024-2025")
            .unwrap()
    }

    fn setup() -> (JobCoordinator, Materializer, Arc<MemoryRecordSource>) {
        let records = Arc::new(MemoryRecordSource::default());
        let materializer = Materializer::new(records.clone(), Arc::new(MemoryCacheStore::new()));
        let coordinator = JobCoordinator::new(Arc::new(MemoryJobStore::new()));
        (coordinator, materializer, records)
    }

    #[tokio::test]
    async fn test_submit_returns_pending_job() {
        let (coordinator, _, _) = setup();

        let job = coordinator.submit(filter()).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.filter_key, filter().filter_key());
        assert!(job.started_at.is_none());
    }

    #[tokio::test]
    async fn test_failed_materialization_is_recorded_on_job() {
        let (coordinator, materializer, records) = setup();
        records.set_unavailable(true);
        coordinator.submit(filter()).await.unwrap();

        assert_eq!(coordinator.run_pending(&materializer).await.unwrap(), 1);

        let job = &coordinator.list(1).await.unwrap()[0];
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.is_some());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_job_cannot_be_claimed_again() {
        let (coordinator, materializer, _) = setup();
        let job = coordinator.submit(filter()).await.unwrap();
        coordinator.run_pending(&materializer).await.unwrap();

        let result = coordinator.store().claim(job.id).await;

        assert!(matches!(
            result,
            Err(StorageError::InvalidTransition {
                from: JobStatus::Completed,
                to: JobStatus::Running
            })
        ));
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (coordinator, materializer, _) = setup();
        let (tx, rx) = watch::channel(false);
        let worker = JobWorker::new(0, coordinator, materializer, Duration::from_secs(60));

        let handle = tokio::spawn(worker.run(rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
