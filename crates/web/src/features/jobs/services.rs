use storage::{
    error::Result,
    models::{FilterTuple, RankingJob},
    services::JobCoordinator,
};
use uuid::Uuid;

/// Queue a materialization job; a background worker picks it up
pub async fn submit_job(coordinator: &JobCoordinator, filters: FilterTuple) -> Result<RankingJob> {
    coordinator.submit(filters).await
}

/// Most recent jobs first
pub async fn list_jobs(coordinator: &JobCoordinator, limit: u32) -> Result<Vec<RankingJob>> {
    coordinator.list(limit).await
}

pub async fn get_job(coordinator: &JobCoordinator, id: Uuid) -> Result<RankingJob> {
    coordinator.get(id).await
}
