use std::time::Duration;

use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::ranking_job::RankingJobRow;
use crate::models::{FilterTuple, JobStatus, LEASE_EXPIRED, RankingJob};
use crate::traits::JobStore;

const JOB_COLUMNS: &str = "id, status, filters, filter_key, total_records, created_at, \
                           started_at, completed_at, error_message";

#[derive(Clone)]
pub struct RankingsJobRepository {
    pool: PgPool,
}

impl RankingsJobRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn insert(&self, filters: &FilterTuple) -> Result<RankingJob> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            INSERT INTO rankings_jobs (id, status, filters, filter_key)
            VALUES ($1, $2, $3, $4)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(JobStatus::Pending.as_str())
        .bind(Json(filters))
        .bind(filters.filter_key())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<RankingJob> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM rankings_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<RankingJob>> {
        let rows = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM rankings_jobs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RankingJob::try_from).collect()
    }

    pub async fn mark_running(&self, id: Uuid) -> Result<RankingJob> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            UPDATE rankings_jobs
            SET status = 'running', started_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.refused(id, JobStatus::Running).await),
        }
    }

    /// Claims the oldest pending job whose tuple is not already being materialized.
    ///
    /// `SKIP LOCKED` lets concurrent workers pass over a row another worker is
    /// claiming instead of queueing behind it.
    pub async fn mark_next_running(&self) -> Result<Option<RankingJob>> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            UPDATE rankings_jobs
            SET status = 'running', started_at = NOW()
            WHERE id = (
                SELECT j.id
                FROM rankings_jobs j
                WHERE j.status = 'pending'
                  AND NOT EXISTS (
                      SELECT 1 FROM rankings_jobs r
                      WHERE r.filter_key = j.filter_key AND r.status = 'running'
                  )
                ORDER BY j.created_at, j.id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(RankingJob::try_from).transpose()
    }

    pub async fn mark_completed(&self, id: Uuid, total_records: i32) -> Result<RankingJob> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            UPDATE rankings_jobs
            SET status = 'completed', total_records = $2, completed_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(total_records)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.refused(id, JobStatus::Completed).await),
        }
    }

    pub async fn mark_failed(&self, id: Uuid, message: &str) -> Result<RankingJob> {
        let row = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            UPDATE rankings_jobs
            SET status = 'failed', error_message = $2, completed_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.refused(id, JobStatus::Failed).await),
        }
    }

    /// Fails running jobs whose lease ran out, freeing their tuples for the next claim.
    pub async fn mark_expired_failed(&self, lease: Duration) -> Result<Vec<RankingJob>> {
        let rows = sqlx::query_as::<_, RankingJobRow>(&format!(
            r#"
            UPDATE rankings_jobs
            SET status = 'failed', error_message = $2, completed_at = NOW()
            WHERE status = 'running'
              AND started_at < NOW() - make_interval(secs => $1)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(lease.as_secs_f64())
        .bind(LEASE_EXPIRED)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RankingJob::try_from).collect()
    }

    /// Explains why a conditional update matched nothing.
    async fn refused(&self, id: Uuid, to: JobStatus) -> StorageError {
        match self.find_by_id(id).await {
            Ok(job) => StorageError::InvalidTransition {
                from: job.status,
                to,
            },
            Err(e) => e,
        }
    }
}

#[async_trait::async_trait]
impl JobStore for RankingsJobRepository {
    async fn create(&self, filters: FilterTuple) -> Result<RankingJob> {
        self.insert(&filters).await
    }

    async fn get(&self, id: Uuid) -> Result<RankingJob> {
        self.find_by_id(id).await
    }

    async fn list(&self, limit: u32) -> Result<Vec<RankingJob>> {
        self.list_recent(limit).await
    }

    async fn claim(&self, id: Uuid) -> Result<RankingJob> {
        self.mark_running(id).await
    }

    async fn claim_next(&self) -> Result<Option<RankingJob>> {
        self.mark_next_running().await
    }

    async fn complete(&self, id: Uuid, total_records: i32) -> Result<RankingJob> {
        self.mark_completed(id, total_records).await
    }

    async fn fail(&self, id: Uuid, message: &str) -> Result<RankingJob> {
        self.mark_failed(id, message).await
    }

    async fn expire_running(&self, lease: Duration) -> Result<Vec<RankingJob>> {
        self.mark_expired_failed(lease).await
    }
}
