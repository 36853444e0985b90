#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use storage::models::{Course, FilterTuple, Gender, PerformanceRecord, Stroke};
use uuid::Uuid;

pub fn meet_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 8)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

pub fn filter(age_group: &str) -> FilterTuple {
    FilterTuple::from_parts("Back", 50, "LCM", "F", age_group, "all", "all", "2024-2025").unwrap()
}

/// A 50 back LCM girls swim from the 2024-2025 season.
pub fn swim(name: &str, seconds: &str, age: i32, age_group: &str) -> PerformanceRecord {
    PerformanceRecord {
        time_id: Uuid::new_v4(),
        swimmer_id: Uuid::new_v4(),
        swimmer_name: name.to_string(),
        club: Some("Mission Viejo Nadadores".to_string()),
        age: Some(age),
        region: Some("Western".to_string()),
        lsc: Some("SC".to_string()),
        meet_id: Uuid::from_u128(7),
        meet_name: "Spring Age Group Invitational".to_string(),
        meet_date: meet_date(),
        season: Some("2024-2025".to_string()),
        event_id: Uuid::from_u128(11),
        stroke: Stroke::Back,
        distance: 50,
        course: Course::Lcm,
        gender: Some(Gender::F),
        age_group: Some(age_group.to_string()),
        time_seconds: seconds.parse().unwrap(),
        time_formatted: seconds.to_string(),
        is_personal_best: true,
        recorded_at: meet_date() + Duration::minutes(5),
    }
}

/// The three ten-and-under backstrokers used across tests.
pub fn podium() -> Vec<PerformanceRecord> {
    vec![
        swim("Maya Chen", "34.50", 10, "10 and under"),
        swim("Ava Brooks", "33.31", 9, "10 and under"),
        swim("Lena Ortiz", "34.27", 10, "10 and under"),
    ]
}
