use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::event::{Course, Gender, Stroke};

/// One swim time joined with its swimmer, meet and event.
///
/// Owned by the record store; this crate only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub time_id: Uuid,
    pub swimmer_id: Uuid,
    pub swimmer_name: String,
    pub club: Option<String>,
    pub age: Option<i32>,
    pub region: Option<String>,
    pub lsc: Option<String>,
    pub meet_id: Uuid,
    pub meet_name: String,
    pub meet_date: NaiveDateTime,
    pub season: Option<String>,
    pub event_id: Uuid,
    pub stroke: Stroke,
    pub distance: i32,
    pub course: Course,
    pub gender: Option<Gender>,
    /// Nominal age group the time was logged against
    pub age_group: Option<String>,
    pub time_seconds: Decimal,
    pub time_formatted: String,
    pub is_personal_best: bool,
    /// Insertion time, used as the stable tie-breaker
    pub recorded_at: NaiveDateTime,
}

/// Raw joined row as it comes out of Postgres.
#[derive(Debug, FromRow)]
pub struct PerformanceRow {
    pub time_id: Uuid,
    pub swimmer_id: Uuid,
    pub swimmer_name: String,
    pub club: Option<String>,
    pub age: Option<i32>,
    pub region: Option<String>,
    pub lsc: Option<String>,
    pub meet_id: Uuid,
    pub meet_name: String,
    pub meet_date: NaiveDateTime,
    pub season: Option<String>,
    pub event_id: Uuid,
    pub stroke: String,
    pub distance: i32,
    pub course: String,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub time_seconds: Decimal,
    pub time_formatted: String,
    pub is_personal_best: bool,
    pub recorded_at: NaiveDateTime,
}

impl TryFrom<PerformanceRow> for PerformanceRecord {
    type Error = StorageError;

    fn try_from(row: PerformanceRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, value: &str| {
            StorageError::InvalidData(format!(
                "time {} has unrecognised {} '{}'",
                row.time_id, field, value
            ))
        };

        let stroke = row
            .stroke
            .parse()
            .map_err(|_| invalid("stroke", &row.stroke))?;
        let course = row
            .course
            .parse()
            .map_err(|_| invalid("course", &row.course))?;
        let gender = row
            .gender
            .as_deref()
            .map(|g| g.parse().map_err(|_| invalid("gender", g)))
            .transpose()?;

        Ok(Self {
            time_id: row.time_id,
            swimmer_id: row.swimmer_id,
            swimmer_name: row.swimmer_name,
            club: row.club,
            age: row.age,
            region: row.region,
            lsc: row.lsc,
            meet_id: row.meet_id,
            meet_name: row.meet_name,
            meet_date: row.meet_date,
            season: row.season,
            event_id: row.event_id,
            stroke,
            distance: row.distance,
            course,
            gender,
            age_group: row.age_group,
            time_seconds: row.time_seconds,
            time_formatted: row.time_formatted,
            is_personal_best: row.is_personal_best,
            recorded_at: row.recorded_at,
        })
    }
}
