use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::job::{CreateJobRequest, JobListQuery},
    models::RankingJob,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/rankings-jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job queued", body = RankingJob),
        (status = 400, description = "Malformed or invalid filter payload")
    ),
    tag = "rankings-jobs"
)]
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(request) = payload?;

    let job = services::submit_job(&state.coordinator, request.filters).await?;

    Ok((StatusCode::CREATED, Json(job)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/rankings-jobs",
    params(JobListQuery),
    responses(
        (status = 200, description = "Jobs, newest first", body = Vec<RankingJob>),
        (status = 400, description = "Invalid limit")
    ),
    tag = "rankings-jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobListQuery>, QueryRejection>,
) -> Result<Json<Vec<RankingJob>>, WebError> {
    let Query(query) = query?;
    query.validate()?;

    let jobs = services::list_jobs(&state.coordinator, query.limit).await?;

    Ok(Json(jobs))
}

#[utoipa::path(
    get,
    path = "/api/rankings-jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job id")
    ),
    responses(
        (status = 200, description = "Job found", body = RankingJob),
        (status = 404, description = "Job not found")
    ),
    tag = "rankings-jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let job = services::get_job(&state.coordinator, id).await?;

    Ok(Json(job).into_response())
}
