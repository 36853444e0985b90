use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::ranking_cache::batch_keys;
use crate::models::{CacheRecord, FilterTuple, NewCacheRecord};
use crate::traits::CacheStore;

/// Rows per INSERT statement; keeps bind parameters well under the Postgres limit.
const INSERT_CHUNK: usize = 500;

const INSERT_COLUMNS: &str = r#"
    INSERT INTO rankings_cache (
        id, filter_key, time_id, swimmer_id, event_id, meet_id,
        rank, absolute_rank, bracket_rank, total_swimmers,
        stroke, distance, course, gender, age_group, region, lsc, season,
        swimmer_name, club, age, swimmer_region, swimmer_lsc,
        time_seconds, time_formatted, is_personal_best,
        meet_name, meet_date, event_age_group
    )
"#;

/// Columns refreshed when a surviving row is rewritten.
const MUTABLE_COLUMNS: [&str; 26] = [
    "swimmer_id",
    "event_id",
    "meet_id",
    "rank",
    "absolute_rank",
    "bracket_rank",
    "total_swimmers",
    "stroke",
    "distance",
    "course",
    "gender",
    "age_group",
    "region",
    "lsc",
    "season",
    "swimmer_name",
    "club",
    "age",
    "swimmer_region",
    "swimmer_lsc",
    "time_seconds",
    "time_formatted",
    "is_personal_best",
    "meet_name",
    "meet_date",
    "event_age_group",
];

/// `ON CONFLICT` clause that only touches rows whose content changed, so rebuilding
/// an unchanged tuple leaves `updated_at` alone.
fn upsert_clause() -> String {
    let assignments = MUTABLE_COLUMNS
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let current = MUTABLE_COLUMNS
        .iter()
        .map(|column| format!("rankings_cache.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let incoming = MUTABLE_COLUMNS
        .iter()
        .map(|column| format!("EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        " ON CONFLICT (id) DO UPDATE SET {assignments}, updated_at = NOW() \
         WHERE ({current}) IS DISTINCT FROM ({incoming})"
    )
}

#[derive(Clone)]
pub struct RankingsCacheRepository {
    pool: PgPool,
}

impl RankingsCacheRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn find_by_filter(&self, filter: &FilterTuple, limit: u32) -> Result<Vec<CacheRecord>> {
        let records = sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT *
            FROM rankings_cache
            WHERE filter_key = $1
            ORDER BY rank, absolute_rank, time_id
            LIMIT $2
            "#,
        )
        .bind(filter.filter_key())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Swaps the rows of every batch inside a single transaction.
    ///
    /// Transaction-scoped advisory locks on the filter keys serialize concurrent
    /// writers of the same tuple. They are taken in key order so two multi-tuple
    /// writers cannot deadlock. Readers keep seeing the previous rows until commit.
    pub async fn replace_for_filters(
        &self,
        batches: &[(FilterTuple, Vec<NewCacheRecord>)],
    ) -> Result<usize> {
        let keys = batch_keys(batches)?;

        let mut order: Vec<usize> = (0..batches.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        let mut tx = self.pool.begin().await?;
        let on_conflict = upsert_clause();
        let mut written = 0;

        for index in order {
            let filter_key = &keys[index];
            let entries = &batches[index].1;

            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(filter_key)
                .execute(&mut *tx)
                .await?;

            let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
            let removed = sqlx::query(
                "DELETE FROM rankings_cache WHERE filter_key = $1 AND NOT (id = ANY($2))",
            )
            .bind(filter_key)
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            for chunk in entries.chunks(INSERT_CHUNK) {
                let mut query = QueryBuilder::new(INSERT_COLUMNS);
                query.push_values(chunk, |mut row, entry| {
                    row.push_bind(entry.id)
                        .push_bind(&entry.filter_key)
                        .push_bind(entry.time_id)
                        .push_bind(entry.swimmer_id)
                        .push_bind(entry.event_id)
                        .push_bind(entry.meet_id)
                        .push_bind(entry.rank)
                        .push_bind(entry.absolute_rank)
                        .push_bind(entry.bracket_rank)
                        .push_bind(entry.total_swimmers)
                        .push_bind(&entry.stroke)
                        .push_bind(entry.distance)
                        .push_bind(&entry.course)
                        .push_bind(&entry.gender)
                        .push_bind(&entry.age_group)
                        .push_bind(&entry.region)
                        .push_bind(&entry.lsc)
                        .push_bind(&entry.season)
                        .push_bind(&entry.swimmer_name)
                        .push_bind(&entry.club)
                        .push_bind(entry.age)
                        .push_bind(&entry.swimmer_region)
                        .push_bind(&entry.swimmer_lsc)
                        .push_bind(entry.time_seconds)
                        .push_bind(&entry.time_formatted)
                        .push_bind(entry.is_personal_best)
                        .push_bind(&entry.meet_name)
                        .push_bind(entry.meet_date)
                        .push_bind(&entry.event_age_group);
                });
                query.push(&on_conflict);

                query.build().execute(&mut *tx).await?;
            }

            tracing::debug!(
                filter_key = %filter_key,
                written = entries.len(),
                removed,
                "replaced cached rankings"
            );
            written += entries.len();
        }

        tx.commit().await?;

        Ok(written)
    }

    pub async fn count_for_filter(&self, filter: &FilterTuple) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rankings_cache WHERE filter_key = $1",
        )
        .bind(filter.filter_key())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rankings_cache")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl CacheStore for RankingsCacheRepository {
    async fn lookup(&self, filter: &FilterTuple, limit: u32) -> Result<Vec<CacheRecord>> {
        self.find_by_filter(filter, limit).await
    }

    async fn replace_many(
        &self,
        batches: Vec<(FilterTuple, Vec<NewCacheRecord>)>,
    ) -> Result<usize> {
        self.replace_for_filters(&batches).await
    }

    async fn entry_count(&self, filter: &FilterTuple) -> Result<i64> {
        self.count_for_filter(filter).await
    }

    async fn clear_all(&self) -> Result<u64> {
        self.delete_all().await
    }
}
