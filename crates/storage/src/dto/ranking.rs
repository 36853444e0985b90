use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Result, StorageError};
use crate::models::{CacheRecord, FilterPayload, FilterTuple, WILDCARD};
use crate::services::rank_calculator::{DEFAULT_LIMIT, RankedEntry};

/// Query string shared by the dynamic and cached ranking endpoints.
///
/// Values arrive as raw strings; [`RankingQuery::to_filter`] turns them into a
/// validated [`FilterTuple`].
#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RankingQuery {
    /// Free, Back, Breast, Fly or IM
    pub stroke: Option<String>,
    pub distance: Option<String>,
    /// SCY, SCM or LCM
    pub course: Option<String>,
    /// M, F or all
    pub gender: Option<String>,
    /// Bracket ("10 and under", "13-14") or exact age ("9"), or all
    pub age_group: Option<String>,
    pub region: Option<String>,
    pub lsc: Option<String>,
    /// "2024-2025" or "2024"
    pub season: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT as u32
}

impl RankingQuery {
    pub fn to_filter(&self) -> Result<FilterTuple> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StorageError::invalid_filter(format!("{} is required", name)))
        }

        fn optional(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or(WILDCARD)
        }

        let distance = required(&self.distance, "distance")?;
        let distance = distance.parse::<u16>().map_err(|_| {
            StorageError::invalid_filter(format!("distance '{}' is not a number", distance))
        })?;

        FilterTuple::from_parts(
            required(&self.stroke, "stroke")?,
            distance,
            required(&self.course, "course")?,
            optional(&self.gender),
            optional(&self.age_group),
            optional(&self.region),
            optional(&self.lsc),
            required(&self.season, "season")?,
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SwimmerInfo {
    pub swimmer_id: Uuid,
    pub name: String,
    pub club: Option<String>,
    pub age: Option<i32>,
    pub region: Option<String>,
    pub lsc: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeetInfo {
    pub meet_id: Uuid,
    pub name: String,
    pub date: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RankingEntry {
    pub rank: i64,
    pub absolute_rank: i64,
    pub bracket_rank: Option<i64>,
    pub total_swimmers: i64,
    pub time_id: Uuid,
    pub event_id: Uuid,
    pub time_seconds: f64,
    pub time_formatted: String,
    pub is_personal_best: bool,
    /// Age group the time was logged against
    pub age_group: Option<String>,
    pub swimmer: SwimmerInfo,
    pub meet: MeetInfo,
}

impl From<RankedEntry> for RankingEntry {
    fn from(entry: RankedEntry) -> Self {
        let record = entry.record;

        Self {
            rank: i64::from(entry.rank),
            absolute_rank: i64::from(entry.absolute_rank),
            bracket_rank: entry.bracket_rank.map(i64::from),
            total_swimmers: i64::from(entry.total_swimmers),
            time_id: record.time_id,
            event_id: record.event_id,
            time_seconds: record.time_seconds.to_f64().unwrap_or_default(),
            time_formatted: record.time_formatted,
            is_personal_best: record.is_personal_best,
            age_group: record.age_group,
            swimmer: SwimmerInfo {
                swimmer_id: record.swimmer_id,
                name: record.swimmer_name,
                club: record.club,
                age: record.age,
                region: record.region,
                lsc: record.lsc,
            },
            meet: MeetInfo {
                meet_id: record.meet_id,
                name: record.meet_name,
                date: record.meet_date,
            },
        }
    }
}

impl From<CacheRecord> for RankingEntry {
    fn from(row: CacheRecord) -> Self {
        Self {
            rank: i64::from(row.rank),
            absolute_rank: i64::from(row.absolute_rank),
            bracket_rank: row.bracket_rank.map(i64::from),
            total_swimmers: i64::from(row.total_swimmers),
            time_id: row.time_id,
            event_id: row.event_id,
            time_seconds: row.time_seconds.to_f64().unwrap_or_default(),
            time_formatted: row.time_formatted,
            is_personal_best: row.is_personal_best,
            age_group: row.event_age_group,
            swimmer: SwimmerInfo {
                swimmer_id: row.swimmer_id,
                name: row.swimmer_name,
                club: row.club,
                age: row.age,
                region: row.swimmer_region,
                lsc: row.swimmer_lsc,
            },
            meet: MeetInfo {
                meet_id: row.meet_id,
                name: row.meet_name,
                date: row.meet_date,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RankingsResponse {
    pub data: Vec<RankingEntry>,
    /// Entries in this response
    pub count: usize,
    /// Size of the whole ranked set, before the limit was applied
    pub total_swimmers: i64,
    pub filters: FilterPayload,
}

impl RankingsResponse {
    pub fn new(data: Vec<RankingEntry>, total_swimmers: i64, filter: FilterTuple) -> Self {
        Self {
            count: data.len(),
            data,
            total_swimmers,
            filters: filter.into(),
        }
    }

    /// Cached rows carry the participant count on every row.
    pub fn from_cache(rows: Vec<CacheRecord>, filter: FilterTuple) -> Self {
        let total_swimmers = rows.first().map_or(0, |row| i64::from(row.total_swimmers));
        let data = rows.into_iter().map(RankingEntry::from).collect();

        Self::new(data, total_swimmers, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> RankingQuery {
        RankingQuery {
            stroke: Some("Back".to_string()),
            distance: Some("50".to_string()),
            course: Some("LCM".to_string()),
            gender: Some("F".to_string()),
            age_group: Some("10 and under".to_string()),
            region: None,
            lsc: None,
            season: Some("2024-2025".to_string()),
            limit: 100,
        }
    }

    #[test]
    fn test_missing_dimensions_default_to_wildcard() {
        let filter = query().to_filter().unwrap();
        assert_eq!(filter.region, None);
        assert_eq!(filter.filter_key(), "Back|50|LCM|F|10 and under|*|*|2024-2025");
    }

    #[test]
    fn test_required_dimensions_are_enforced() {
        let missing_stroke = RankingQuery {
            stroke: None,
            ..query()
        };
        let blank_season = RankingQuery {
            season: Some("  ".to_string()),
            ..query()
        };
        let word_distance = RankingQuery {
            distance: Some("fifty".to_string()),
            ..query()
        };

        for query in [missing_stroke, blank_season, word_distance] {
            assert!(matches!(
                query.to_filter(),
                Err(StorageError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn test_limit_range_is_validated() {
        assert!(query().validate().is_ok());
        assert!(RankingQuery { limit: 0, ..query() }.validate().is_err());
        assert!(RankingQuery { limit: 1001, ..query() }.validate().is_err());
    }
}
