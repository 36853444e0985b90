use axum::Json;
use storage::{dto::region::RegionResponse, models::REGIONS};

#[utoipa::path(
    get,
    path = "/api/regions",
    responses(
        (status = 200, description = "Regions and the LSCs they contain", body = Vec<RegionResponse>)
    ),
    tag = "regions"
)]
pub async fn list_regions() -> Json<Vec<RegionResponse>> {
    Json(REGIONS.iter().map(RegionResponse::from).collect())
}
