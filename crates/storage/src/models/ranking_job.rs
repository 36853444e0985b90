use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::filter::{FilterPayload, FilterTuple};

/// Error recorded on a running job whose worker stopped reporting back.
pub const LEASE_EXPIRED: &str = "lease expired";

/// Lifecycle of a materialization job.
///
/// ```text
/// pending ──claim──▶ running ──▶ completed
///                        └─────▶ failed
/// ```
///
/// Completed and failed are terminal. A failed job is resubmitted as a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Checks a transition, returning the error the stores report on refusal.
    pub fn transition_to(&self, next: JobStatus) -> Result<JobStatus, StorageError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StorageError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(StorageError::InvalidData(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}

/// A request to materialize the cache for one filter tuple.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankingJob {
    pub id: Uuid,
    pub status: JobStatus,
    #[schema(value_type = FilterPayload)]
    pub filters: FilterTuple,
    pub filter_key: String,
    pub total_records: Option<i32>,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
}

impl RankingJob {
    /// A fresh pending job.
    pub fn pending(filters: FilterTuple, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            filter_key: filters.filter_key(),
            filters,
            total_records: None,
            created_at,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct RankingJobRow {
    pub id: Uuid,
    pub status: String,
    pub filters: Json<FilterTuple>,
    pub filter_key: String,
    pub total_records: Option<i32>,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
}

impl TryFrom<RankingJobRow> for RankingJob {
    type Error = StorageError;

    fn try_from(row: RankingJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            status: row.status.parse()?,
            filters: row.filters.0,
            filter_key: row.filter_key,
            total_records: row.total_records,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}
