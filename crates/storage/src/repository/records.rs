use sqlx::{PgPool, QueryBuilder};

use crate::error::Result;
use crate::models::FilterTuple;
use crate::models::performance::{PerformanceRecord, PerformanceRow};
use crate::traits::RecordSource;

/// Read-only view over the `times` table joined with swimmers, meets and events.
#[derive(Clone)]
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Records for every non-age dimension of `filter`, in ranking order.
    pub async fn find_for_filter(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>> {
        let mut query = QueryBuilder::new(
            r#"
            SELECT
                t.id AS time_id,
                s.id AS swimmer_id,
                s.name AS swimmer_name,
                s.club,
                s.age,
                s.region,
                s.lsc,
                m.id AS meet_id,
                m.name AS meet_name,
                m.date AS meet_date,
                m.season,
                e.id AS event_id,
                e.stroke,
                e.distance,
                e.course,
                COALESCE(e.gender, s.gender) AS gender,
                e.age_group,
                t.time_seconds,
                t.time_formatted,
                t.is_personal_best,
                t.created_at AS recorded_at
            FROM times t
            INNER JOIN swimmers s ON t.swimmer_id = s.id
            INNER JOIN meets m ON t.meet_id = m.id
            INNER JOIN events e ON t.event_id = e.id
            WHERE e.stroke =
            "#,
        );
        query.push_bind(filter.stroke.as_str());
        query.push(" AND e.distance = ");
        query.push_bind(i32::from(filter.distance));
        query.push(" AND e.course = ");
        query.push_bind(filter.course.as_str());

        if let Some(gender) = filter.gender {
            query.push(" AND COALESCE(e.gender, s.gender) = ");
            query.push_bind(gender.as_str());
        }

        if let Some(ref region) = filter.region {
            query.push(" AND s.region = ");
            query.push_bind(region.as_str());
        }

        if let Some(ref lsc) = filter.lsc {
            query.push(" AND s.lsc = ");
            query.push_bind(lsc.as_str());
        }

        if let Some(ref season) = filter.season {
            query.push(" AND m.season = ");
            query.push_bind(season.as_str());
        }

        query.push(" ORDER BY t.time_seconds, t.created_at, t.id");

        let rows = query
            .build_query_as::<PerformanceRow>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(filter = %filter, rows = rows.len(), "fetched performance records");

        rows.into_iter().map(PerformanceRecord::try_from).collect()
    }
}

#[async_trait::async_trait]
impl RecordSource for RecordRepository {
    async fn fetch(&self, filter: &FilterTuple) -> Result<Vec<PerformanceRecord>> {
        self.find_for_filter(filter).await
    }
}
