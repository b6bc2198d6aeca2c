//! Derived per-member statistics for the weekly report.

use std::collections::BTreeMap;

use crate::analyzers::utility::mean;
use crate::data::{RaceRow, ResultRow};

/// Session counts by event type for one member over the report window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityCount {
    pub member: String,
    pub races: usize,
    pub practices: usize,
    pub qualifyings: usize,
    pub time_trials: usize,
    pub hosted: usize,
}

impl ActivityCount {
    pub fn from_races(member: &str, races: &[RaceRow], hosted: usize) -> Self {
        let mut count = ActivityCount {
            member: member.to_string(),
            hosted,
            ..ActivityCount::default()
        };
        for race in races {
            match race.event_type_name.as_str() {
                "Race" => count.races += 1,
                "Practice" => count.practices += 1,
                "Qualify" => count.qualifyings += 1,
                "Time Trial" => count.time_trials += 1,
                _ => {}
            }
        }
        count
    }

    /// Members with nothing to show are left off the activity chart.
    pub fn has_activity(&self) -> bool {
        self.races + self.practices + self.qualifyings + self.time_trials + self.hosted > 0
    }
}

/// Number of recent races per series name, across all members.
pub fn series_counts(races: &[RaceRow]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for race in races {
        *counts.entry(race.series_name.clone()).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Net iRating change over an ordered sequence of race results: pre-race
/// rating of the first to post-race rating of the last. `None` without races.
pub fn rating_change(results: &[ResultRow]) -> Option<i64> {
    let first = results.first()?;
    let last = results.last()?;
    Some(last.newi_rating - first.oldi_rating)
}

/// Class strength of field: mean pre-race iRating over the participants.
pub fn strength_of_field(participants: &[ResultRow]) -> Option<f64> {
    if participants.is_empty() {
        return None;
    }
    let ratings: Vec<f64> = participants.iter().map(|r| r.oldi_rating as f64).collect();
    Some(mean(&ratings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn race_row(event_type_name: &str, series_name: &str) -> RaceRow {
        serde_json::from_value(serde_json::json!({
            "subsession_id": 1,
            "event_type_name": event_type_name,
            "series_name": series_name,
            "session_start_time": Utc::now().to_rfc3339(),
        }))
        .unwrap()
    }

    #[test]
    fn test_activity_counting() {
        let races = vec![
            race_row("Race", "a"),
            race_row("Race", "a"),
            race_row("Practice", "a"),
            race_row("Time Trial", "a"),
            race_row("Warmup", "a"),
        ];
        let count = ActivityCount::from_races("Ole", &races, 3);

        assert_eq!(count.races, 2);
        assert_eq!(count.practices, 1);
        assert_eq!(count.qualifyings, 0);
        assert_eq!(count.time_trials, 1);
        assert_eq!(count.hosted, 3);
        assert!(count.has_activity());
    }

    #[test]
    fn test_hosted_only_still_counts_as_activity() {
        let count = ActivityCount::from_races("Ingar", &[], 1);
        assert!(count.has_activity());
        assert!(!ActivityCount::from_races("Ingar", &[], 0).has_activity());
    }

    #[test]
    fn test_series_counts() {
        let races = vec![
            race_row("Race", "GT3 Challenge"),
            race_row("Race", "MX-5 Cup"),
            race_row("Race", "GT3 Challenge"),
        ];
        assert_eq!(
            series_counts(&races),
            vec![("GT3 Challenge".to_string(), 2), ("MX-5 Cup".to_string(), 1)]
        );
    }

    #[test]
    fn test_rating_change_spans_first_to_last() {
        let row = |oldi_rating: i64, newi_rating: i64| ResultRow {
            oldi_rating,
            newi_rating,
            ..ResultRow::default()
        };
        let results = vec![row(1500, 1550), row(1550, 1490), row(1490, 1600)];
        assert_eq!(rating_change(&results), Some(100));
        assert_eq!(rating_change(&[]), None);
    }

    #[test]
    fn test_strength_of_field() {
        let row = |oldi_rating: i64| ResultRow {
            oldi_rating,
            ..ResultRow::default()
        };
        assert_eq!(strength_of_field(&[row(1000), row(2000)]), Some(1500.0));
        assert_eq!(strength_of_field(&[]), None);
    }
}
