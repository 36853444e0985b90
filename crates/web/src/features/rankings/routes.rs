use axum::{Router, routing::get};

use super::handlers::{get_cached_rankings, get_rankings};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rankings", get(get_rankings))
        .route("/rankings-cache", get(get_cached_rankings))
}
