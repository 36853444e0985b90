use std::time::Duration;

use uuid::Uuid;

use crate::error::Result;
use crate::models::{CacheRecord, FilterTuple, NewCacheRecord, PerformanceRecord, RankingJob};

/// Read access to raw performance records.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Records matching the stroke, distance and course of `filter`.
    ///
    /// Implementations may narrow further on the other non-age dimensions, but
    /// must never filter by age group; bracket membership is resolved by the caller.
    async fn fetch(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>>;
}

/// Materialized rankings, keyed by filter tuple.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached rows for `filter`, ordered by rank.
    async fn lookup(&self, filter: &FilterTuple, limit: u32) -> Result<Vec<CacheRecord>>;

    /// Atomically swaps the rows of one filter tuple for `entries`.
    ///
    /// Rows of other tuples are never touched. Returns the number of rows now cached.
    async fn replace(&self, filter: &FilterTuple, entries: Vec<NewCacheRecord>) -> Result<usize> {
        self.replace_many(vec![(filter.clone(), entries)]).await
    }

    /// Swaps several tuples at once: either every tuple gets its new rows or none does.
    ///
    /// Returns the combined number of rows now cached for those tuples.
    async fn replace_many(
        &self,
        batches: Vec<(FilterTuple, Vec<NewCacheRecord>)>,
    ) -> Result<usize>;

    async fn entry_count(&self, filter: &FilterTuple) -> Result<i64>;

    /// Drops every cached row. Returns the number of rows removed.
    async fn clear_all(&self) -> Result<u64>;
}

/// Persistence for materialization jobs.
///
/// Every status change is a conditional transition: a store refuses to move a
/// job out of a state it is not currently in.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, filters: FilterTuple) -> Result<RankingJob>;

    async fn get(&self, id: Uuid) -> Result<RankingJob>;

    /// Most recent jobs first.
    async fn list(&self, limit: u32) -> Result<Vec<RankingJob>>;

    /// pending -> running for one job.
    async fn claim(&self, id: Uuid) -> Result<RankingJob>;

    /// Claims the oldest pending job whose tuple has no job currently running.
    async fn claim_next(&self) -> Result<Option<RankingJob>>;

    async fn complete(&self, id: Uuid, total_records: i32) -> Result<RankingJob>;

    async fn fail(&self, id: Uuid, message: &str) -> Result<RankingJob>;

    /// Fails every job that has been running for longer than `lease`.
    ///
    /// A crashed worker never reports back, and its running job would otherwise keep
    /// every later job of the same tuple from being claimed.
    async fn expire_running(&self, lease: Duration) -> Result<Vec<RankingJob>>;
}
