use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use storage::dto::ranking::{RankingQuery, RankingsResponse};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/rankings",
    params(RankingQuery),
    responses(
        (status = 200, description = "Rankings computed from raw records", body = RankingsResponse),
        (status = 400, description = "Invalid filter")
    ),
    tag = "rankings"
)]
pub async fn get_rankings(
    State(state): State<AppState>,
    query: Result<Query<RankingQuery>, QueryRejection>,
) -> Result<Response, WebError> {
    let Query(query) = query?;
    query.validate()?;
    let filter = query.to_filter()?;

    let response = services::dynamic_rankings(state.records.as_ref(), filter, query.limit).await?;

    Ok(Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/api/rankings-cache",
    params(RankingQuery),
    responses(
        (status = 200, description = "Materialized rankings; empty when the tuple was never materialized", body = RankingsResponse),
        (status = 400, description = "Invalid filter")
    ),
    tag = "rankings"
)]
pub async fn get_cached_rankings(
    State(state): State<AppState>,
    query: Result<Query<RankingQuery>, QueryRejection>,
) -> Result<Response, WebError> {
    let Query(query) = query?;
    query.validate()?;
    let filter = query.to_filter()?;

    let response = services::cached_rankings(state.cache.as_ref(), filter, query.limit).await?;

    Ok(Json(response).into_response())
}
