use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, StorageError};
use crate::models::event::{Course, EVENT_DISTANCES, Gender, Stroke};
use crate::models::region;
use crate::services::age_bracket::AgeBracket;

/// Query value meaning "do not filter on this dimension".
pub const WILDCARD: &str = "all";

/// Placeholder for wildcard dimensions inside a filter key.
const KEY_WILDCARD: &str = "*";

fn is_wildcard(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(WILDCARD)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    All,
    Bracket(AgeBracket),
}

impl AgeGroup {
    pub fn parse(value: &str) -> Result<Self> {
        if is_wildcard(value) {
            return Ok(Self::All);
        }

        AgeBracket::parse(value)
            .map(Self::Bracket)
            .ok_or_else(|| StorageError::invalid_filter("ageGroup must not be blank"))
    }

    pub fn bracket(&self) -> Option<&AgeBracket> {
        match self {
            Self::All => None,
            Self::Bracket(bracket) => Some(bracket),
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD),
            Self::Bracket(bracket) => bracket.fmt(f),
        }
    }
}

/// Identity of one ranking context.
///
/// `None` in an optional dimension is the wildcard. It is a value of its own and
/// never equal to a concrete region, LSC, gender or season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FilterPayload", into = "FilterPayload")]
pub struct FilterTuple {
    pub stroke: Stroke,
    pub distance: u16,
    pub course: Course,
    pub gender: Option<Gender>,
    pub age_group: AgeGroup,
    pub region: Option<String>,
    pub lsc: Option<String>,
    pub season: Option<String>,
}

/// Wire form of a [`FilterTuple`], used for job payloads.
///
/// Optional dimensions default to `"all"`. Unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterPayload {
    #[schema(example = "Back")]
    pub stroke: String,
    #[schema(example = 50)]
    pub distance: u16,
    #[schema(example = "LCM")]
    pub course: String,
    #[serde(default = "wildcard")]
    #[schema(example = "F")]
    pub gender: String,
    #[serde(default = "wildcard", alias = "age_group")]
    #[schema(example = "10 and under")]
    pub age_group: String,
    #[serde(default = "wildcard")]
    pub region: String,
    #[serde(default = "wildcard")]
    pub lsc: String,
    #[serde(default = "wildcard")]
    #[schema(example = "2024-2025")]
    pub season: String,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl FilterTuple {
    /// Builds a validated tuple from raw boundary values.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        stroke: &str,
        distance: u16,
        course: &str,
        gender: &str,
        age_group: &str,
        region: &str,
        lsc: &str,
        season: &str,
    ) -> Result<Self> {
        if !EVENT_DISTANCES.contains(&distance) {
            return Err(StorageError::invalid_filter(format!(
                "distance {} is not a pool event distance",
                distance
            )));
        }

        let gender = if is_wildcard(gender) {
            None
        } else {
            Some(gender.parse()?)
        };

        let region = if is_wildcard(region) {
            None
        } else {
            let known = region::find_region(region).ok_or_else(|| {
                StorageError::invalid_filter(format!("unknown region '{}'", region.trim()))
            })?;
            Some(known)
        };

        let lsc = if is_wildcard(lsc) {
            None
        } else {
            let code = region::find_lsc_code(lsc).ok_or_else(|| {
                StorageError::invalid_filter(format!("unknown lsc '{}'", lsc.trim()))
            })?;
            if let Some(region) = region
                && !region.contains_lsc(code)
            {
                return Err(StorageError::invalid_filter(format!(
                    "lsc '{}' is not part of region '{}'",
                    code, region.name
                )));
            }
            Some(code.to_string())
        };

        let season = if is_wildcard(season) {
            None
        } else {
            Some(parse_season(season)?)
        };

        Ok(Self {
            stroke: stroke.parse()?,
            distance,
            course: course.parse()?,
            gender,
            age_group: AgeGroup::parse(age_group)?,
            region: region.map(|r| r.name.to_string()),
            lsc,
            season,
        })
    }

    /// Deterministic cache key. Equal tuples always produce equal keys.
    pub fn filter_key(&self) -> String {
        fn or_wildcard(value: Option<&str>) -> &str {
            value.unwrap_or(KEY_WILDCARD)
        }

        let age_group = match &self.age_group {
            AgeGroup::All => KEY_WILDCARD.to_string(),
            AgeGroup::Bracket(bracket) => bracket.to_string(),
        };

        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.stroke,
            self.distance,
            self.course,
            or_wildcard(self.gender.as_ref().map(Gender::as_str)),
            age_group,
            or_wildcard(self.region.as_deref()),
            or_wildcard(self.lsc.as_deref()),
            or_wildcard(self.season.as_deref()),
        )
    }

    /// Same tuple narrowed to another age group.
    pub fn with_age_group(&self, age_group: AgeGroup) -> Self {
        Self {
            age_group,
            ..self.clone()
        }
    }
}

impl fmt::Display for FilterTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filter_key())
    }
}

/// Accepts "2024" or "2024-2025".
fn parse_season(season: &str) -> Result<String> {
    let season = season.trim();
    let invalid = || {
        StorageError::invalid_filter(format!(
            "season '{}' must look like 2024 or 2024-2025",
            season
        ))
    };

    let year = |value: &str| -> Option<u16> {
        (value.len() == 4)
            .then(|| value.parse::<u16>().ok())
            .flatten()
    };

    match season.split_once('-') {
        None => year(season).ok_or_else(invalid)?,
        Some((start, end)) => {
            let (start, end) = (year(start).ok_or_else(invalid)?, year(end).ok_or_else(invalid)?);
            if end != start + 1 {
                return Err(invalid());
            }
            start
        }
    };

    Ok(season.to_string())
}

impl TryFrom<FilterPayload> for FilterTuple {
    type Error = StorageError;

    fn try_from(payload: FilterPayload) -> Result<Self> {
        Self::from_parts(
            &payload.stroke,
            payload.distance,
            &payload.course,
            &payload.gender,
            &payload.age_group,
            &payload.region,
            &payload.lsc,
            &payload.season,
        )
    }
}

impl From<FilterTuple> for FilterPayload {
    fn from(filter: FilterTuple) -> Self {
        Self {
            stroke: filter.stroke.to_string(),
            distance: filter.distance,
            course: filter.course.to_string(),
            gender: filter
                .gender
                .map(|g| g.to_string())
                .unwrap_or_else(wildcard),
            age_group: filter.age_group.to_string(),
            region: filter.region.unwrap_or_else(wildcard),
            lsc: filter.lsc.unwrap_or_else(wildcard),
            season: filter.season.unwrap_or_else(wildcard),
        }
    }
}
