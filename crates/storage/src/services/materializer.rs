use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::error::{Result, StorageError};
use crate::models::{AgeGroup, FilterTuple, NewCacheRecord, PerformanceRecord};
use crate::services::age_bracket::CANONICAL_BRACKETS;
use crate::services::rank_calculator::compute_ranks;
use crate::traits::{CacheStore, RecordSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializationResult {
    pub filter_key: String,
    pub record_count: usize,
}

/// Recomputes rankings from raw records and writes them to the cache.
#[derive(Clone)]
pub struct Materializer {
    records: Arc<dyn RecordSource>,
    cache: Arc<dyn CacheStore>,
    fetch_timeout: Option<Duration>,
}

impl Materializer {
    pub fn new(records: Arc<dyn RecordSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            records,
            cache,
            fetch_timeout: None,
        }
    }

    /// Fails a materialization whose record fetch takes longer than `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Rebuilds the cache for one concrete tuple.
    ///
    /// Nothing is written unless ranking succeeds, so a failure leaves the previous
    /// rows in place. A tuple with no matching records becomes empty.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn materialize(&self, filter: &FilterTuple) -> Result<MaterializationResult> {
        let entries = self.prepare(filter).await?;
        let record_count = self.cache.replace(filter, entries).await?;

        tracing::info!(record_count, "materialized rankings");

        Ok(MaterializationResult {
            filter_key: filter.filter_key(),
            record_count,
        })
    }

    /// Materializes what a job asked for. `all` expands to every canonical bracket.
    ///
    /// Every bracket is fetched and ranked before anything is written, and the
    /// brackets are then swapped in one store write, so a failure in any of them
    /// leaves the whole cache as it was. Returns the combined number of cached rows.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn materialize_job(&self, filter: &FilterTuple) -> Result<usize> {
        let tuples: Vec<FilterTuple> = match filter.age_group {
            AgeGroup::All => CANONICAL_BRACKETS
                .iter()
                .map(|bracket| filter.with_age_group(AgeGroup::Bracket(bracket.clone())))
                .collect(),
            AgeGroup::Bracket(_) => vec![filter.clone()],
        };

        let mut batches = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let entries = self.prepare(&tuple).await?;
            batches.push((tuple, entries));
        }

        let brackets = batches.len();
        let total = self.cache.replace_many(batches).await?;

        tracing::info!(brackets, total, "materialized rankings for job");

        Ok(total)
    }

    /// Fetches and ranks one concrete tuple into cache rows, without writing them.
    async fn prepare(&self, filter: &FilterTuple) -> Result<Vec<NewCacheRecord>> {
        if filter.age_group.bracket().is_none() {
            return Err(StorageError::invalid_filter(
                "materialization needs a concrete age group",
            ));
        }

        let records = self.fetch(filter).await?;
        let ranked = compute_ranks(&records, filter, None);

        let entries: Vec<NewCacheRecord> = ranked
            .entries
            .iter()
            .map(|entry| NewCacheRecord::from_ranked(filter, entry))
            .collect();

        if entries.is_empty() {
            tracing::info!(filter = %filter, "no records match, tuple will be emptied");
        } else {
            tracing::debug!(
                filter = %filter,
                fetched = records.len(),
                ranked = entries.len(),
                "ranked tuple"
            );
        }

        Ok(entries)
    }

    async fn fetch(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.records.fetch(filter))
                .await
                .map_err(|_| StorageError::Timeout(limit))?,
            None => self.records.fetch(filter).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCacheStore, MemoryRecordSource};

    fn materializer() -> Materializer {
        Materializer::new(
            Arc::new(MemoryRecordSource::default()),
            Arc::new(MemoryCacheStore::new()),
        )
    }

    #[tokio::test]
    async fn test_wildcard_age_group_is_rejected() {
        let filter =
            FilterTuple::from_parts("Free", 50, "SCY", "all", "all", "all", "all", "all").unwrap();

        let result = materializer().materialize(&filter).await;

        assert!(matches!(result, Err(StorageError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn test_job_with_all_and_no_records_totals_zero() {
        let filter =
            FilterTuple::from_parts("Free", 50, "SCY", "F", "all", "all", "all", "2024").unwrap();

        let total = materializer().materialize_job(&filter).await.unwrap();

        assert_eq!(total, 0);
    }
}
