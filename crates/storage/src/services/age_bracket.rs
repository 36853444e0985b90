//! Age-group bracket resolution.
//!
//! Times are logged against whatever nominal age group the meet used: an exact age
//! ("9"), an "N and under" bracket, or a range such as "13-14". Queries are mostly
//! issued at bracket granularity, so a single record can count towards several
//! brackets at once. Everything here is pure so the cache can be verified by
//! recomputing from raw records.

use std::collections::BTreeSet;
use std::fmt;

/// An age-group label in its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeBracket {
    /// "N and under" (also written "N & under", "N&U", "Nu")
    AndUnder(u8),
    /// A bare age, e.g. "9"
    Exact(u8),
    /// Inclusive range, e.g. "13-14"
    Range(u8, u8),
    /// "N and over" (also written "N+", "N & over")
    AndOver(u8),
    /// Any other label ("Open", "Senior"), lowercased with collapsed whitespace
    Named(String),
}

/// Canonical brackets used for bracket-level rankings, youngest first.
pub const CANONICAL_BRACKETS: [AgeBracket; 6] = [
    AgeBracket::AndUnder(8),
    AgeBracket::AndUnder(10),
    AgeBracket::Range(11, 12),
    AgeBracket::Range(13, 14),
    AgeBracket::Range(15, 16),
    AgeBracket::Range(17, 18),
];

const AND_UNDER_SUFFIXES: [&str; 5] = ["and under", "& under", "&under", "&u", "u"];
const AND_OVER_SUFFIXES: [&str; 4] = ["and over", "& over", "&over", "+"];

impl AgeBracket {
    /// Parses a free-form label. Returns `None` only for blank labels.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if normalized.is_empty() {
            return None;
        }

        if let Ok(age) = normalized.parse::<u8>() {
            return Some(Self::Exact(age));
        }

        if let Some(age) = strip_age_suffix(&normalized, &AND_UNDER_SUFFIXES) {
            return Some(Self::AndUnder(age));
        }

        if let Some(age) = strip_age_suffix(&normalized, &AND_OVER_SUFFIXES) {
            return Some(Self::AndOver(age));
        }

        if let Some((low, high)) = normalized.split_once('-')
            && let (Ok(low), Ok(high)) = (low.trim().parse::<u8>(), high.trim().parse::<u8>())
            && low <= high
        {
            return Some(Self::Range(low, high));
        }

        Some(Self::Named(normalized))
    }

    /// The canonical bracket an athlete of `age` competes in, if any.
    ///
    /// Ages above 18 have no canonical bracket and keep their literal label.
    pub fn canonical_for_age(age: u8) -> Option<Self> {
        match age {
            0..=8 => Some(Self::AndUnder(8)),
            9..=10 => Some(Self::AndUnder(10)),
            11..=12 => Some(Self::Range(11, 12)),
            13..=14 => Some(Self::Range(13, 14)),
            15..=16 => Some(Self::Range(15, 16)),
            17..=18 => Some(Self::Range(17, 18)),
            _ => None,
        }
    }
}

fn strip_age_suffix(label: &str, suffixes: &[&str]) -> Option<u8> {
    suffixes
        .iter()
        .filter_map(|suffix| label.strip_suffix(suffix))
        .find_map(|age| age.trim().parse::<u8>().ok())
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AndUnder(age) => write!(f, "{} and under", age),
            Self::Exact(age) => write!(f, "{}", age),
            Self::Range(low, high) => write!(f, "{}-{}", low, high),
            Self::AndOver(age) => write!(f, "{} and over", age),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// The set of brackets a single record participates in.
///
/// "N and under" membership cascades upwards without bound, so it is kept as a
/// floor instead of an enumerated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketMembership {
    brackets: BTreeSet<AgeBracket>,
    and_under_floor: Option<u8>,
}

impl BracketMembership {
    pub fn contains(&self, bracket: &AgeBracket) -> bool {
        if self.brackets.contains(bracket) {
            return true;
        }

        match (bracket, self.and_under_floor) {
            (AgeBracket::AndUnder(limit), Some(floor)) => *limit >= floor,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty() && self.and_under_floor.is_none()
    }

    /// Explicit members plus the canonical "and under" brackets reached by the cascade.
    #[cfg(test)]
    pub fn labels(&self) -> BTreeSet<AgeBracket> {
        let mut labels = self.brackets.clone();
        labels.extend(
            CANONICAL_BRACKETS
                .iter()
                .filter(|bracket| self.contains(bracket))
                .cloned(),
        );
        labels
    }

    fn insert(&mut self, bracket: AgeBracket) {
        self.brackets.insert(bracket);
    }

    fn cascade_and_under(&mut self, floor: u8) {
        self.and_under_floor = Some(match self.and_under_floor {
            Some(existing) => existing.min(floor),
            None => floor,
        });
    }
}

/// Resolves the brackets a record counts towards.
///
/// - "N and under": that bracket, and every "M and under" with `M >= N` the
///   athlete's age also satisfies.
/// - A bare age: that exact-age bracket, plus the canonical bracket for the
///   athlete's age (which cascades like any other "and under" bracket).
/// - Anything else: exactly the logged bracket.
pub fn resolve(athlete_age: u8, event_age_group: &str) -> BracketMembership {
    let mut membership = BracketMembership::default();

    let Some(logged) = AgeBracket::parse(event_age_group) else {
        return membership;
    };

    match logged {
        AgeBracket::AndUnder(limit) => {
            membership.insert(AgeBracket::AndUnder(limit));
            membership.cascade_and_under(limit.max(athlete_age));
        }
        AgeBracket::Exact(age) => {
            membership.insert(AgeBracket::Exact(age));
            if let Some(canonical) = AgeBracket::canonical_for_age(athlete_age) {
                if let AgeBracket::AndUnder(limit) = canonical {
                    membership.cascade_and_under(limit);
                }
                membership.insert(canonical);
            }
        }
        other => membership.insert(other),
    }

    membership
}

/// Resolution for records whose athlete has no recorded age.
///
/// Exact-age and "and under" labels imply the age at the time of the swim, so they
/// resolve as if the athlete were that age. Other labels resolve to themselves.
pub fn resolve_label_only(event_age_group: &str) -> BracketMembership {
    match AgeBracket::parse(event_age_group) {
        Some(AgeBracket::Exact(age)) | Some(AgeBracket::AndUnder(age)) => {
            resolve(age, event_age_group)
        }
        Some(other) => {
            let mut membership = BracketMembership::default();
            membership.insert(other);
            membership
        }
        None => BracketMembership::default(),
    }
}
