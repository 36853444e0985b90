use std::sync::Arc;
use std::time::Duration;

use storage::{
    Database,
    repository::{RankingsCacheRepository, RankingsJobRepository, RecordRepository},
    services::{JobCoordinator, Materializer},
    traits::{CacheStore, JobStore, RecordSource},
};

/// Shared handler state. Stores sit behind traits so the router can run on
/// in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordSource>,
    pub cache: Arc<dyn CacheStore>,
    pub coordinator: JobCoordinator,
}

impl AppState {
    pub fn new(
        records: Arc<dyn RecordSource>,
        cache: Arc<dyn CacheStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            records,
            cache,
            coordinator: JobCoordinator::new(jobs),
        }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(
            Arc::new(RecordRepository::new(db.pool())),
            Arc::new(RankingsCacheRepository::new(db.pool())),
            Arc::new(RankingsJobRepository::new(db.pool())),
        )
    }

    /// Running jobs older than `lease` are failed so their tuple can be rebuilt.
    pub fn with_job_lease(mut self, lease: Duration) -> Self {
        self.coordinator = self.coordinator.with_lease(lease);
        self
    }

    /// A materializer over this state's record and cache stores.
    pub fn materializer(&self) -> Materializer {
        Materializer::new(self.records.clone(), self.cache.clone())
    }
}
