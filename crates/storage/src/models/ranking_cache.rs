use std::collections::HashSet;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::filter::FilterTuple;
use crate::services::rank_calculator::RankedEntry;

/// Namespace for deterministic cache row ids.
const CACHE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_2a7e_8d14_4b6a_9c1e_3f7d_2b8a_6e41);

/// A materialized ranking row scoped to one filter tuple.
///
/// Rows are denormalized so a cached lookup is a single indexed read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CacheRecord {
    pub id: Uuid,
    pub filter_key: String,
    pub time_id: Uuid,
    pub swimmer_id: Uuid,
    pub event_id: Uuid,
    pub meet_id: Uuid,
    pub rank: i32,
    pub absolute_rank: i32,
    pub bracket_rank: Option<i32>,
    pub total_swimmers: i32,

    // Filter context
    pub stroke: String,
    pub distance: i32,
    pub course: String,
    pub gender: Option<String>,
    pub age_group: String,
    pub region: Option<String>,
    pub lsc: Option<String>,
    pub season: Option<String>,

    // Snapshot of the ranked performance
    pub swimmer_name: String,
    pub club: Option<String>,
    pub age: Option<i32>,
    pub swimmer_region: Option<String>,
    pub swimmer_lsc: Option<String>,
    pub time_seconds: Decimal,
    pub time_formatted: String,
    pub is_personal_best: bool,
    pub meet_name: String,
    pub meet_date: NaiveDateTime,
    pub event_age_group: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A cache row about to be written; timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCacheRecord {
    pub id: Uuid,
    pub filter_key: String,
    pub time_id: Uuid,
    pub swimmer_id: Uuid,
    pub event_id: Uuid,
    pub meet_id: Uuid,
    pub rank: i32,
    pub absolute_rank: i32,
    pub bracket_rank: Option<i32>,
    pub total_swimmers: i32,
    pub stroke: String,
    pub distance: i32,
    pub course: String,
    pub gender: Option<String>,
    pub age_group: String,
    pub region: Option<String>,
    pub lsc: Option<String>,
    pub season: Option<String>,
    pub swimmer_name: String,
    pub club: Option<String>,
    pub age: Option<i32>,
    pub swimmer_region: Option<String>,
    pub swimmer_lsc: Option<String>,
    pub time_seconds: Decimal,
    pub time_formatted: String,
    pub is_personal_best: bool,
    pub meet_name: String,
    pub meet_date: NaiveDateTime,
    pub event_age_group: Option<String>,
}

/// Checks a multi-tuple cache write and returns each batch's filter key.
///
/// Every row must belong to its batch's tuple, and a tuple may appear only once.
pub(crate) fn batch_keys(batches: &[(FilterTuple, Vec<NewCacheRecord>)]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(batches.len());

    for (filter, entries) in batches {
        let filter_key = filter.filter_key();

        if let Some(stray) = entries.iter().find(|e| e.filter_key != filter_key) {
            return Err(StorageError::ConstraintViolation(format!(
                "cache row for '{}' cannot be written under '{}'",
                stray.filter_key, filter_key
            )));
        }
        if !seen.insert(filter_key.clone()) {
            return Err(StorageError::ConstraintViolation(format!(
                "tuple '{}' appears twice in one cache write",
                filter_key
            )));
        }

        keys.push(filter_key);
    }

    Ok(keys)
}

fn rank_to_i32(rank: u32) -> i32 {
    i32::try_from(rank).unwrap_or(i32::MAX)
}

impl NewCacheRecord {
    /// Row id for a performance within a filter tuple. Stable across rebuilds.
    pub fn cache_id(filter_key: &str, time_id: Uuid) -> Uuid {
        Uuid::new_v5(
            &CACHE_ID_NAMESPACE,
            format!("{}/{}", filter_key, time_id).as_bytes(),
        )
    }

    pub fn from_ranked(filter: &FilterTuple, entry: &RankedEntry) -> Self {
        let filter_key = filter.filter_key();
        let record = &entry.record;

        Self {
            id: Self::cache_id(&filter_key, record.time_id),
            filter_key,
            time_id: record.time_id,
            swimmer_id: record.swimmer_id,
            event_id: record.event_id,
            meet_id: record.meet_id,
            rank: rank_to_i32(entry.rank),
            absolute_rank: rank_to_i32(entry.absolute_rank),
            bracket_rank: entry.bracket_rank.map(rank_to_i32),
            total_swimmers: rank_to_i32(entry.total_swimmers),
            stroke: filter.stroke.to_string(),
            distance: i32::from(filter.distance),
            course: filter.course.to_string(),
            gender: filter.gender.map(|g| g.to_string()),
            age_group: filter.age_group.to_string(),
            region: filter.region.clone(),
            lsc: filter.lsc.clone(),
            season: filter.season.clone(),
            swimmer_name: record.swimmer_name.clone(),
            club: record.club.clone(),
            age: record.age,
            swimmer_region: record.region.clone(),
            swimmer_lsc: record.lsc.clone(),
            time_seconds: record.time_seconds,
            time_formatted: record.time_formatted.clone(),
            is_personal_best: record.is_personal_best,
            meet_name: record.meet_name.clone(),
            meet_date: record.meet_date,
            event_age_group: record.age_group.clone(),
        }
    }

    /// Materializes the row with the given timestamps.
    pub fn into_record(self, created_at: NaiveDateTime, updated_at: NaiveDateTime) -> CacheRecord {
        CacheRecord {
            id: self.id,
            filter_key: self.filter_key,
            time_id: self.time_id,
            swimmer_id: self.swimmer_id,
            event_id: self.event_id,
            meet_id: self.meet_id,
            rank: self.rank,
            absolute_rank: self.absolute_rank,
            bracket_rank: self.bracket_rank,
            total_swimmers: self.total_swimmers,
            stroke: self.stroke,
            distance: self.distance,
            course: self.course,
            gender: self.gender,
            age_group: self.age_group,
            region: self.region,
            lsc: self.lsc,
            season: self.season,
            swimmer_name: self.swimmer_name,
            club: self.club,
            age: self.age,
            swimmer_region: self.swimmer_region,
            swimmer_lsc: self.swimmer_lsc,
            time_seconds: self.time_seconds,
            time_formatted: self.time_formatted,
            is_personal_best: self.is_personal_best,
            meet_name: self.meet_name,
            meet_date: self.meet_date,
            event_age_group: self.event_age_group,
            created_at,
            updated_at,
        }
    }
}

impl CacheRecord {
    /// The writable part of the row, without timestamps.
    pub fn content(&self) -> NewCacheRecord {
        NewCacheRecord {
            id: self.id,
            filter_key: self.filter_key.clone(),
            time_id: self.time_id,
            swimmer_id: self.swimmer_id,
            event_id: self.event_id,
            meet_id: self.meet_id,
            rank: self.rank,
            absolute_rank: self.absolute_rank,
            bracket_rank: self.bracket_rank,
            total_swimmers: self.total_swimmers,
            stroke: self.stroke.clone(),
            distance: self.distance,
            course: self.course.clone(),
            gender: self.gender.clone(),
            age_group: self.age_group.clone(),
            region: self.region.clone(),
            lsc: self.lsc.clone(),
            season: self.season.clone(),
            swimmer_name: self.swimmer_name.clone(),
            club: self.club.clone(),
            age: self.age,
            swimmer_region: self.swimmer_region.clone(),
            swimmer_lsc: self.swimmer_lsc.clone(),
            time_seconds: self.time_seconds,
            time_formatted: self.time_formatted.clone(),
            is_personal_best: self.is_personal_best,
            meet_name: self.meet_name.clone(),
            meet_date: self.meet_date,
            event_age_group: self.event_age_group.clone(),
        }
    }
}
