//! Rank computation over raw performance records.
//!
//! Ranking always runs over the whole filtered set before any truncation, so the
//! participant count and every rank are global properties of the filter.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::models::filter::FilterTuple;
use crate::models::performance::PerformanceRecord;
use crate::services::age_bracket::{self, AgeBracket};

/// Result size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub record: PerformanceRecord,
    /// Rank used for ordering: the bracket rank when an age group is requested,
    /// the absolute rank otherwise
    pub rank: u32,
    /// Position among all records matching the non-age dimensions
    pub absolute_rank: u32,
    pub bracket_rank: Option<u32>,
    pub total_swimmers: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResult {
    pub entries: Vec<RankedEntry>,
    /// Size of the ranked set before truncation
    pub total: usize,
}

/// Ranks `records` under `filter`, returning at most `limit` entries
/// (`None` returns everything).
pub fn compute_ranks(
    records: &[PerformanceRecord],
    filter: &FilterTuple,
    limit: Option<usize>,
) -> RankedResult {
    let mut selected: Vec<&PerformanceRecord> = records
        .iter()
        .filter(|record| is_rankable(record) && matches_dimensions(filter, record))
        .collect();
    selected.sort_by(|a, b| ranking_order(a, b));

    let absolute = selected.into_iter().zip(1u32..);
    let limit = limit.unwrap_or(usize::MAX);

    let Some(requested) = filter.age_group.bracket() else {
        let ranked: Vec<_> = absolute.collect();
        let total = ranked.len();
        let total_swimmers = count_to_u32(total);

        let entries = ranked
            .into_iter()
            .take(limit)
            .map(|(record, rank)| RankedEntry {
                record: record.clone(),
                rank,
                absolute_rank: rank,
                bracket_rank: None,
                total_swimmers,
            })
            .collect();

        return RankedResult { entries, total };
    };

    // Filtering a sorted sequence keeps it sorted, so bracket order needs no re-sort.
    let in_bracket: Vec<_> = absolute
        .filter(|(record, _)| belongs_to_bracket(record, requested))
        .collect();
    let total = in_bracket.len();
    let total_swimmers = count_to_u32(total);

    let entries = in_bracket
        .into_iter()
        .zip(1u32..)
        .take(limit)
        .map(|((record, absolute_rank), bracket_rank)| RankedEntry {
            record: record.clone(),
            rank: bracket_rank,
            absolute_rank,
            bracket_rank: Some(bracket_rank),
            total_swimmers,
        })
        .collect();

    RankedResult { entries, total }
}

/// Ascending time, then insertion time, then record id.
pub fn ranking_order(a: &PerformanceRecord, b: &PerformanceRecord) -> Ordering {
    a.time_seconds
        .cmp(&b.time_seconds)
        .then_with(|| a.recorded_at.cmp(&b.recorded_at))
        .then_with(|| a.time_id.cmp(&b.time_id))
}

/// Non-age dimensions. Missing record values never match a concrete filter value.
pub fn matches_dimensions(filter: &FilterTuple, record: &PerformanceRecord) -> bool {
    fn dimension<T: PartialEq + ?Sized>(wanted: Option<&T>, actual: Option<&T>) -> bool {
        match wanted {
            None => true,
            Some(wanted) => actual == Some(wanted),
        }
    }

    record.stroke == filter.stroke
        && record.distance == i32::from(filter.distance)
        && record.course == filter.course
        && dimension(filter.gender.as_ref(), record.gender.as_ref())
        && dimension(filter.region.as_deref(), record.region.as_deref())
        && dimension(filter.lsc.as_deref(), record.lsc.as_deref())
        && dimension(filter.season.as_deref(), record.season.as_deref())
}

fn belongs_to_bracket(record: &PerformanceRecord, requested: &AgeBracket) -> bool {
    let Some(label) = record.age_group.as_deref() else {
        tracing::debug!(time_id = %record.time_id, "record has no age group, skipping");
        return false;
    };

    let membership = match record.age.map(u8::try_from) {
        Some(Ok(age)) => age_bracket::resolve(age, label),
        Some(Err(_)) => {
            tracing::warn!(
                time_id = %record.time_id,
                age = ?record.age,
                "swimmer age out of range, resolving from the event label"
            );
            age_bracket::resolve_label_only(label)
        }
        None => age_bracket::resolve_label_only(label),
    };

    membership.contains(requested)
}

fn is_rankable(record: &PerformanceRecord) -> bool {
    if record.time_seconds > Decimal::ZERO {
        return true;
    }

    tracing::error!(
        time_id = %record.time_id,
        time_seconds = %record.time_seconds,
        "non-positive time reached the rank calculator, excluding it"
    );
    false
}

fn count_to_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{Course, Gender, Stroke};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn filter(age_group: &str) -> FilterTuple {
        FilterTuple::from_parts("Back", 50, "LCM", "F", age_group, "all", "all", "2024-2025")
            .unwrap()
    }

    fn record(seconds: &str, age: i32, label: &str) -> PerformanceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        PerformanceRecord {
            time_id: Uuid::new_v4(),
            swimmer_id: Uuid::new_v4(),
            swimmer_name: format!("Swimmer {}", seconds),
            club: Some("Test Club".to_string()),
            age: Some(age),
            region: Some("Southern".to_string()),
            lsc: Some("LA".to_string()),
            meet_id: Uuid::nil(),
            meet_name: "Test Age Group Meet".to_string(),
            meet_date: date,
            season: Some("2024-2025".to_string()),
            event_id: Uuid::nil(),
            stroke: Stroke::Back,
            distance: 50,
            course: Course::Lcm,
            gender: Some(Gender::F),
            age_group: Some(label.to_string()),
            time_seconds: seconds.parse().unwrap(),
            time_formatted: seconds.to_string(),
            is_personal_best: false,
            recorded_at: date,
        }
    }

    fn names(result: &RankedResult) -> Vec<&str> {
        result
            .entries
            .iter()
            .map(|e| e.record.swimmer_name.as_str())
            .collect()
    }

    #[test]
    fn test_three_swimmers_rank_in_time_order() {
        let records = vec![
            record("34.50", 10, "10 and under"),
            record("33.31", 9, "10 and under"),
            record("34.27", 10, "10 and under"),
        ];

        let result = compute_ranks(&records, &filter("10 and under"), None);

        assert_eq!(result.total, 3);
        let ranks: Vec<_> = result
            .entries
            .iter()
            .map(|e| (e.rank, e.record.time_formatted.as_str(), e.total_swimmers))
            .collect();
        assert_eq!(
            ranks,
            vec![(1, "33.31", 3), (2, "34.27", 3), (3, "34.50", 3)]
        );
    }

    #[test]
    fn test_ties_break_on_insertion_then_id() {
        let mut first = record("30.00", 10, "10 and under");
        let mut second = record("30.00", 10, "10 and under");
        second.recorded_at = first.recorded_at + chrono::Duration::seconds(1);
        first.swimmer_name = "first".to_string();
        second.swimmer_name = "second".to_string();

        let mut same_instant_a = record("30.00", 10, "10 and under");
        let mut same_instant_b = record("30.00", 10, "10 and under");
        same_instant_a.recorded_at = second.recorded_at + chrono::Duration::seconds(1);
        same_instant_b.recorded_at = same_instant_a.recorded_at;
        same_instant_a.time_id = Uuid::from_u128(1);
        same_instant_b.time_id = Uuid::from_u128(2);
        same_instant_a.swimmer_name = "id-1".to_string();
        same_instant_b.swimmer_name = "id-2".to_string();

        let records = vec![same_instant_b, second, same_instant_a, first];
        let result = compute_ranks(&records, &filter("all"), None);

        assert_eq!(names(&result), vec!["first", "second", "id-1", "id-2"]);
    }

    #[test]
    fn test_ranking_is_deterministic_regardless_of_input_order() {
        let records: Vec<_> = ["31.00", "30.00", "30.00", "29.50", "30.00"]
            .into_iter()
            .map(|t| record(t, 10, "10 and under"))
            .collect();
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = compute_ranks(&records, &filter("10u"), None);
        let backward = compute_ranks(&reversed, &filter("10u"), None);

        assert_eq!(forward, backward);
        assert_eq!(forward, compute_ranks(&records, &filter("10u"), None));
    }

    #[test]
    fn test_eight_and_under_swim_counts_towards_ten_and_under() {
        let records = vec![
            record("40.00", 8, "8 and under"),
            record("35.00", 10, "10 and under"),
        ];

        let eight_under = compute_ranks(&records, &filter("8 and under"), None);
        assert_eq!(eight_under.total, 1);
        assert_eq!(eight_under.entries[0].bracket_rank, Some(1));

        let ten_under = compute_ranks(&records, &filter("10 and under"), None);
        assert_eq!(ten_under.total, 2);
        assert_eq!(ten_under.entries[1].record.time_formatted, "40.00");
        assert_eq!(ten_under.entries[1].bracket_rank, Some(2));
    }

    #[test]
    fn test_exact_age_record_appears_in_bracket_query() {
        let records = vec![record("36.10", 9, "9"), record("35.00", 12, "12")];

        let result = compute_ranks(&records, &filter("10 and under"), None);

        assert_eq!(result.total, 1);
        assert_eq!(result.entries[0].record.time_formatted, "36.10");
        assert_eq!(result.entries[0].absolute_rank, 2);
        assert_eq!(result.entries[0].bracket_rank, Some(1));
    }

    #[test]
    fn test_records_outside_bracket_are_excluded() {
        let mut unlabeled = record("30.00", 10, "");
        unlabeled.age_group = None;
        let records = vec![record("31.00", 13, "13-14"), unlabeled];

        let result = compute_ranks(&records, &filter("10 and under"), None);

        assert!(result.entries.is_empty());
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_null_region_only_matches_wildcard() {
        let mut no_region = record("30.00", 10, "10 and under");
        no_region.region = None;
        let records = vec![no_region, record("31.00", 10, "10 and under")];

        let southern = FilterTuple {
            region: Some("Southern".to_string()),
            ..filter("all")
        };
        let result = compute_ranks(&records, &southern, None);
        assert_eq!(names(&result), vec!["Swimmer 31.00"]);

        let everywhere = compute_ranks(&records, &filter("all"), None);
        assert_eq!(everywhere.total, 2);
    }

    #[test]
    fn test_null_lsc_never_matches_concrete_lsc() {
        let mut no_lsc = record("30.00", 10, "10 and under");
        no_lsc.lsc = None;

        let louisiana = FilterTuple {
            lsc: Some("LA".to_string()),
            ..filter("all")
        };

        assert_eq!(compute_ranks(&[no_lsc], &louisiana, None).total, 0);
    }

    #[test]
    fn test_other_dimensions_filter_records() {
        let mut long_distance = record("60.00", 10, "10 and under");
        long_distance.distance = 100;
        let mut other_season = record("30.00", 10, "10 and under");
        other_season.season = Some("2023-2024".to_string());
        let mut male = record("29.00", 10, "10 and under");
        male.gender = Some(Gender::M);

        let records = vec![long_distance, other_season, male, record("33.00", 10, "10u")];
        let result = compute_ranks(&records, &filter("all"), None);

        assert_eq!(names(&result), vec!["Swimmer 33.00"]);
    }

    #[test]
    fn test_limit_applies_after_ranking() {
        let records: Vec<_> = (0..10)
            .map(|i| record(&format!("3{}.00", i), 10, "10 and under"))
            .collect();

        let result = compute_ranks(&records, &filter("10 and under"), Some(3));

        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.total, 10);
        assert!(result.entries.iter().all(|e| e.total_swimmers == 10));
        assert_eq!(result.entries[2].rank, 3);
    }

    #[test]
    fn test_absolute_query_has_no_bracket_rank() {
        let records = vec![record("30.00", 14, "13-14"), record("29.00", 9, "9")];

        let result = compute_ranks(&records, &filter("all"), None);

        assert_eq!(result.total, 2);
        assert!(result.entries.iter().all(|e| e.bracket_rank.is_none()));
        assert_eq!(result.entries[0].rank, 1);
        assert_eq!(result.entries[0].absolute_rank, 1);
    }

    #[test]
    fn test_non_positive_times_are_excluded() {
        let records = vec![record("0", 10, "10 and under"), record("30.00", 10, "10u")];

        let result = compute_ranks(&records, &filter("all"), None);

        assert_eq!(result.total, 1);
    }

    #[test]
    fn test_unknown_age_uses_event_label() {
        let mut unknown_age = record("32.00", 10, "9");
        unknown_age.age = None;

        let result = compute_ranks(&[unknown_age], &filter("10 and under"), None);

        assert_eq!(result.total, 1);
    }
}
