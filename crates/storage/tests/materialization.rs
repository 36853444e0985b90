mod common;

use std::sync::Arc;
use std::time::Duration;

use storage::error::StorageError;
use storage::memory::{MemoryCacheStore, MemoryRecordSource};
use storage::models::{FilterTuple, PerformanceRecord};
use storage::services::{Materializer, compute_ranks};
use storage::traits::{CacheStore, RecordSource};

use common::{filter, podium, swim};

fn setup(
    records: Vec<PerformanceRecord>,
) -> (Materializer, Arc<MemoryRecordSource>, Arc<MemoryCacheStore>) {
    let source = Arc::new(MemoryRecordSource::new(records));
    let cache = Arc::new(MemoryCacheStore::new());
    let materializer = Materializer::new(source.clone(), cache.clone());
    (materializer, source, cache)
}

#[tokio::test]
async fn test_cached_and_dynamic_rankings_agree() {
    let records = podium();
    let (materializer, _, cache) = setup(records.clone());
    let filter = filter("10 and under");

    let result = materializer.materialize(&filter).await.unwrap();
    assert_eq!(result.record_count, 3);
    assert_eq!(result.filter_key, filter.filter_key());

    let cached = cache.lookup(&filter, 100).await.unwrap();
    let dynamic = compute_ranks(&records, &filter, Some(100));

    let cached_view: Vec<_> = cached
        .iter()
        .map(|row| (row.rank, row.time_formatted.clone(), row.total_swimmers))
        .collect();
    assert_eq!(
        cached_view,
        vec![
            (1, "33.31".to_string(), 3),
            (2, "34.27".to_string(), 3),
            (3, "34.50".to_string(), 3),
        ]
    );

    for (row, entry) in cached.iter().zip(&dynamic.entries) {
        assert_eq!(row.time_id, entry.record.time_id);
        assert_eq!(row.rank as u32, entry.rank);
        assert_eq!(row.total_swimmers as u32, entry.total_swimmers);
    }
}

#[tokio::test]
async fn test_rematerializing_unchanged_records_is_idempotent() {
    let (materializer, _, cache) = setup(podium());
    let filter = filter("10 and under");

    materializer.materialize(&filter).await.unwrap();
    let first = cache.lookup(&filter, 100).await.unwrap();

    materializer.materialize(&filter).await.unwrap();
    let second = cache.lookup(&filter, 100).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_new_record_reranks_and_keeps_surviving_rows() {
    let (materializer, source, cache) = setup(podium());
    let filter = filter("10 and under");

    materializer.materialize(&filter).await.unwrap();
    let before = cache.lookup(&filter, 100).await.unwrap();

    source.insert(swim("Zoe Park", "32.90", 8, "8 and under")).await;
    materializer.materialize(&filter).await.unwrap();
    let after = cache.lookup(&filter, 100).await.unwrap();

    assert_eq!(after.len(), 4);
    assert_eq!(after[0].swimmer_name, "Zoe Park");
    assert!(after.iter().all(|row| row.total_swimmers == 4));

    let survivor = after.iter().find(|r| r.id == before[0].id).unwrap();
    assert_eq!(survivor.rank, 2);
    assert_eq!(survivor.created_at, before[0].created_at);
}

#[tokio::test]
async fn test_failed_fetch_leaves_previous_rows() {
    let (materializer, source, cache) = setup(podium());
    let filter = filter("10 and under");

    materializer.materialize(&filter).await.unwrap();
    let before = cache.lookup(&filter, 100).await.unwrap();

    source.set_unavailable(true);
    assert!(materializer.materialize(&filter).await.is_err());

    assert_eq!(cache.lookup(&filter, 100).await.unwrap(), before);
}

#[tokio::test]
async fn test_slow_record_store_times_out() {
    let source = Arc::new(MemoryRecordSource::new(podium()).with_latency(Duration::from_millis(500)));
    let cache = Arc::new(MemoryCacheStore::new());
    let materializer =
        Materializer::new(source, cache.clone()).with_fetch_timeout(Duration::from_millis(10));

    let result = materializer.materialize(&filter("10 and under")).await;

    assert!(matches!(result, Err(StorageError::Timeout(_))));
    assert!(cache.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_replace_only_touches_its_own_tuple() {
    let mut records = podium();
    records.push(swim("Nora Hale", "31.80", 13, "13-14"));
    let (materializer, _, cache) = setup(records);

    materializer.materialize(&filter("13-14")).await.unwrap();
    materializer.materialize(&filter("10 and under")).await.unwrap();

    assert_eq!(cache.entry_count(&filter("13-14")).await.unwrap(), 1);
    assert_eq!(cache.entry_count(&filter("10 and under")).await.unwrap(), 3);
    assert_eq!(cache.snapshot().await.len(), 4);
}

#[tokio::test]
async fn test_tuple_without_records_becomes_empty() {
    let (materializer, _, cache) = setup(podium());

    let result = materializer.materialize(&filter("17-18")).await.unwrap();

    assert_eq!(result.record_count, 0);
    assert!(cache.lookup(&filter("17-18"), 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exact_age_swims_are_cached_under_their_bracket() {
    let mut records = podium();
    records.push(swim("Iris Lane", "35.02", 9, "9"));
    let (materializer, _, cache) = setup(records);

    materializer.materialize(&filter("10 and under")).await.unwrap();
    let cached = cache.lookup(&filter("10 and under"), 100).await.unwrap();

    assert_eq!(cached.len(), 4);
    assert_eq!(cached[3].swimmer_name, "Iris Lane");
    assert_eq!(cached[3].event_age_group.as_deref(), Some("9"));
}

#[tokio::test]
async fn test_clear_all_reports_removed_rows() {
    let (materializer, _, cache) = setup(podium());
    materializer.materialize(&filter("10 and under")).await.unwrap();

    assert_eq!(cache.clear_all().await.unwrap(), 3);
    assert!(cache.snapshot().await.is_empty());
}

/// Serves records from memory but fails every fetch for one age group.
struct BrokenBracket {
    records: MemoryRecordSource,
    age_group: &'static str,
}

#[async_trait::async_trait]
impl RecordSource for BrokenBracket {
    async fn fetch(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>, StorageError> {
        if filter.age_group.to_string() == self.age_group {
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }
        self.records.fetch(filter).await
    }
}

#[tokio::test]
async fn test_all_ages_job_failure_writes_no_bracket() {
    let source = Arc::new(BrokenBracket {
        records: MemoryRecordSource::new(podium()),
        age_group: "13-14",
    });
    let cache = Arc::new(MemoryCacheStore::new());
    let materializer = Materializer::new(source.clone(), cache.clone());

    materializer.materialize(&filter("10 and under")).await.unwrap();
    let before = cache.snapshot().await;

    // Would land in both 8 and under and 10 and under, which expand before 13-14.
    source
        .records
        .insert(swim("Zoe Park", "32.90", 8, "8 and under"))
        .await;

    let result = materializer.materialize_job(&filter("all")).await;

    assert!(matches!(result, Err(StorageError::Database(_))));
    assert_eq!(cache.snapshot().await, before);
    assert_eq!(cache.entry_count(&filter("8 and under")).await.unwrap(), 0);
}
