use axum::{Router, routing::get};

use super::handlers::{create_job, get_job, list_jobs};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rankings-jobs", get(list_jobs).post(create_job))
        .route("/rankings-jobs/:id", get(get_job))
}
