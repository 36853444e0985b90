use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Lsc, Region};

#[derive(Debug, Serialize, ToSchema)]
pub struct LscResponse {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionResponse {
    pub name: String,
    pub lscs: Vec<LscResponse>,
}

impl From<&Lsc> for LscResponse {
    fn from(lsc: &Lsc) -> Self {
        Self {
            code: lsc.code.to_string(),
            name: lsc.name.to_string(),
        }
    }
}

impl From<&Region> for RegionResponse {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name.to_string(),
            lscs: region.lscs.iter().map(LscResponse::from).collect(),
        }
    }
}
