//! In-process stores backing the same traits as the Postgres repositories.
//!
//! Not gated behind `#[cfg(test)]` so the web and admin crates can run their
//! tests, or an embedded deployment, without a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{
    CacheRecord, FilterTuple, JobStatus, LEASE_EXPIRED, NewCacheRecord, PerformanceRecord,
    RankingJob,
};
use crate::models::ranking_cache::batch_keys;
use crate::services::rank_calculator::{matches_dimensions, ranking_order};
use crate::traits::{CacheStore, JobStore, RecordSource};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// A record store held in memory.
///
/// Can be switched offline or slowed down to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    records: RwLock<Vec<PerformanceRecord>>,
    unavailable: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<PerformanceRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Every fetch sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn insert(&self, record: PerformanceRecord) {
        self.records.write().await.push(record);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }

        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .iter()
            .filter(|record| matches_dimensions(filter, record))
            .cloned()
            .collect();
        records.sort_by(ranking_order);

        Ok(records)
    }
}

/// Cache rows grouped by filter key.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    tuples: RwLock<BTreeMap<String, Vec<CacheRecord>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cached row across all tuples.
    pub async fn snapshot(&self) -> Vec<CacheRecord> {
        self.tuples.read().await.values().flatten().cloned().collect()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn lookup(&self, filter: &FilterTuple, limit: u32) -> Result<Vec<CacheRecord>> {
        let tuples = self.tuples.read().await;
        let rows = tuples
            .get(&filter.filter_key())
            .map(|rows| rows.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default();

        Ok(rows)
    }

    async fn replace_many(
        &self,
        batches: Vec<(FilterTuple, Vec<NewCacheRecord>)>,
    ) -> Result<usize> {
        let keys = batch_keys(&batches)?;

        // One write guard for every batch, so readers see all old rows or all new ones.
        let mut tuples = self.tuples.write().await;
        let written_at = now();
        let mut written = 0;

        for (filter_key, (_, entries)) in keys.into_iter().zip(batches) {
            let mut previous: HashMap<Uuid, CacheRecord> = tuples
                .remove(&filter_key)
                .unwrap_or_default()
                .into_iter()
                .map(|row| (row.id, row))
                .collect();

            let mut rows: Vec<CacheRecord> = entries
                .into_iter()
                .map(|entry| match previous.remove(&entry.id) {
                    Some(existing) if existing.content() == entry => existing,
                    Some(existing) => entry.into_record(existing.created_at, written_at),
                    None => entry.into_record(written_at, written_at),
                })
                .collect();
            rows.sort_by(|a, b| {
                (a.rank, a.absolute_rank, a.time_id).cmp(&(b.rank, b.absolute_rank, b.time_id))
            });

            written += rows.len();
            if !rows.is_empty() {
                tuples.insert(filter_key, rows);
            }
        }

        Ok(written)
    }

    async fn entry_count(&self, filter: &FilterTuple) -> Result<i64> {
        let tuples = self.tuples.read().await;
        let count = tuples.get(&filter.filter_key()).map_or(0, Vec::len);

        Ok(count as i64)
    }

    async fn clear_all(&self) -> Result<u64> {
        let mut tuples = self.tuples.write().await;
        let removed = tuples.values().map(Vec::len).sum::<usize>();
        tuples.clear();

        Ok(removed as u64)
    }
}

/// Jobs kept in submission order.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<RankingJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transition<F>(&self, id: Uuid, to: JobStatus, apply: F) -> Result<RankingJob>
    where
        F: FnOnce(&mut RankingJob) + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(StorageError::NotFound)?;

        job.status = job.status.transition_to(to)?;
        apply(job);

        Ok(job.clone())
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, filters: FilterTuple) -> Result<RankingJob> {
        let job = RankingJob::pending(filters, now());
        self.jobs.lock().await.push(job.clone());

        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<RankingJob> {
        self.jobs
            .lock()
            .await
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list(&self, limit: u32) -> Result<Vec<RankingJob>> {
        let jobs = self.jobs.lock().await;

        Ok(jobs.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn claim(&self, id: Uuid) -> Result<RankingJob> {
        self.transition(id, JobStatus::Running, |job| {
            job.started_at = Some(now());
        })
        .await
    }

    async fn claim_next(&self) -> Result<Option<RankingJob>> {
        let mut jobs = self.jobs.lock().await;

        let running: HashSet<String> = jobs
            .iter()
            .filter(|job| job.status == JobStatus::Running)
            .map(|job| job.filter_key.clone())
            .collect();

        let next = jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Pending && !running.contains(&job.filter_key));

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.started_at = Some(now());
            job.clone()
        }))
    }

    async fn complete(&self, id: Uuid, total_records: i32) -> Result<RankingJob> {
        self.transition(id, JobStatus::Completed, |job| {
            job.total_records = Some(total_records);
            job.completed_at = Some(now());
        })
        .await
    }

    async fn fail(&self, id: Uuid, message: &str) -> Result<RankingJob> {
        let message = message.to_string();
        self.transition(id, JobStatus::Failed, move |job| {
            job.error_message = Some(message);
            job.completed_at = Some(now());
        })
        .await
    }

    async fn expire_running(&self, lease: Duration) -> Result<Vec<RankingJob>> {
        let lease = TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = now().checked_sub_signed(lease) else {
            return Ok(Vec::new());
        };

        let mut jobs = self.jobs.lock().await;
        let mut expired = Vec::new();
        for job in jobs.iter_mut() {
            let stale = job.status == JobStatus::Running
                && job.started_at.is_some_and(|started| started < cutoff);
            if stale {
                job.status = JobStatus::Failed;
                job.error_message = Some(LEASE_EXPIRED.to_string());
                job.completed_at = Some(now());
                expired.push(job.clone());
            }
        }

        Ok(expired)
    }
}
