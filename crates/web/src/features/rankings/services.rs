use storage::{
    dto::ranking::{RankingEntry, RankingsResponse},
    error::Result,
    models::FilterTuple,
    services::compute_ranks,
    traits::{CacheStore, RecordSource},
};

/// Compute rankings fresh from the record store
pub async fn dynamic_rankings(
    records: &dyn RecordSource,
    filter: FilterTuple,
    limit: u32,
) -> Result<RankingsResponse> {
    let fetched = records.fetch(&filter).await?;
    let ranked = compute_ranks(&fetched, &filter, Some(limit as usize));

    tracing::debug!(
        filter = %filter,
        fetched = fetched.len(),
        ranked = ranked.total,
        "computed dynamic rankings"
    );

    let total = i64::try_from(ranked.total).unwrap_or(i64::MAX);
    let entries = ranked.entries.into_iter().map(RankingEntry::from).collect();

    Ok(RankingsResponse::new(entries, total, filter))
}

/// Read rankings from the materialized cache only
pub async fn cached_rankings(
    cache: &dyn CacheStore,
    filter: FilterTuple,
    limit: u32,
) -> Result<RankingsResponse> {
    let rows = cache.lookup(&filter, limit).await?;

    Ok(RankingsResponse::from_cache(rows, filter))
}
