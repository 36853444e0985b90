use axum::{Router, routing::get};

use super::handlers::list_regions;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/regions", get(list_regions))
}
