use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{FilterPayload, FilterTuple};

/// Body of a job submission. The filter payload is validated while deserializing.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateJobRequest {
    #[schema(value_type = FilterPayload)]
    pub filters: FilterTuple,
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    #[serde(default = "default_job_limit")]
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: u32,
}

fn default_job_limit() -> u32 {
    50
}
