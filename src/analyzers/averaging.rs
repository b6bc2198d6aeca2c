//! Weekly averaging of per-member rating histories.

use chrono::{DateTime, Duration, Utc};

use super::types::{AveragePoint, MemberSeries};
use super::utility::mean;

/// Combines per-member histories into one series sampled at weekly intervals
/// from `start` (inclusive) while the grid instant is before `now`.
///
/// A member's contribution at a grid instant is the earliest sample recorded
/// strictly after that instant; once the grid has passed the end of a
/// member's history, their latest sample is carried instead. Members with no
/// samples contribute nothing, and zero-valued samples are treated as missing
/// and excluded from the mean. The point value is `None` when nothing
/// contributed. An empty `series` therefore yields a grid of `None` points
/// rather than an error.
///
/// Selecting the sample *after* the instant (instead of at-or-before) matches
/// the upstream behavior this tool reports against; see DESIGN.md before
/// changing it.
pub fn average_series(
    series: &[MemberSeries],
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<AveragePoint> {
    let mut average = Vec::new();
    let mut date = start;
    while date < now {
        let values: Vec<f64> = series
            .iter()
            .filter_map(|s| sample_at(s, date))
            .filter(|v| *v != 0.0)
            .collect();
        let value = if values.is_empty() {
            None
        } else {
            Some(mean(&values))
        };
        average.push(AveragePoint {
            timestamp: date,
            value,
        });
        date += Duration::weeks(1);
    }
    average
}

/// Earliest sample strictly after `instant`, else the member's latest sample.
/// Selection is by timestamp, so unsorted input ranks the same as sorted.
fn sample_at(series: &MemberSeries, instant: DateTime<Utc>) -> Option<f64> {
    let samples = &series.samples;
    samples
        .iter()
        .filter(|s| s.timestamp > instant)
        .min_by_key(|s| s.timestamp)
        .or_else(|| samples.iter().max_by_key(|s| s.timestamp))
        .map(|s| s.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::TimeSample;
    use chrono::TimeZone;

    fn at(date: &str) -> DateTime<Utc> {
        format!("{date}T00:00:00Z").parse().unwrap()
    }

    fn series(samples: &[(&str, f64)]) -> MemberSeries {
        MemberSeries::new(
            samples
                .iter()
                .map(|(d, v)| TimeSample {
                    timestamp: at(d),
                    value: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn test_grid_size_and_order() {
        let start = at("2024-01-01");
        let now = Utc.with_ymd_and_hms(2024, 2, 14, 12, 0, 0).unwrap();
        let points = average_series(&[], start, now);

        // ceil(44.5 days / 7) = 7 points
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].timestamp, start);
        for pair in points.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::weeks(1));
        }
    }

    #[test]
    fn test_empty_series_yield_undefined_points() {
        let points = average_series(
            &[MemberSeries::default(), MemberSeries::default()],
            at("2024-01-01"),
            at("2024-01-22"),
        );
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_zero_valued_sample_is_excluded() {
        // Samples at t0, t0+2w and t0+4w; the middle one is a zero.
        let member = series(&[
            ("2024-01-01", 10.0),
            ("2024-01-15", 0.0),
            ("2024-01-29", 30.0),
        ]);
        let points = average_series(&[member], at("2024-01-01"), at("2024-02-05"));

        assert_eq!(points.len(), 5);
        // Grid points that select the zero sample produce no value at all;
        // later points pick up the 30, the final one via last-sample carry.
        assert_eq!(points[0].value, None);
        assert_eq!(points[1].value, None);
        assert_eq!(points[2].value, Some(30.0));
        assert_eq!(points[3].value, Some(30.0));
        assert_eq!(points[4].value, Some(30.0));
    }

    #[test]
    fn test_member_without_samples_contributes_nothing() {
        // Three weeks, member A flat at 20, member B empty.
        let a = series(&[
            ("2024-01-01", 20.0),
            ("2024-01-08", 20.0),
            ("2024-01-15", 20.0),
        ]);
        let b = MemberSeries::default();
        let points = average_series(&[a, b], at("2024-01-01"), at("2024-01-22"));

        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.value == Some(20.0)));
    }

    #[test]
    fn test_mean_over_contributing_members() {
        let a = series(&[("2024-01-05", 1000.0)]);
        let b = series(&[("2024-01-05", 2000.0)]);
        let points = average_series(&[a, b], at("2024-01-01"), at("2024-01-08"));

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, Some(1500.0));
    }

    #[test]
    fn test_unsorted_input_selects_earliest_following_sample() {
        let member = series(&[("2024-01-20", 50.0), ("2024-01-03", 10.0)]);
        let points = average_series(&[member], at("2024-01-01"), at("2024-01-08"));

        // Both samples postdate the grid point; the earlier one wins even
        // though it is stored last.
        assert_eq!(points[0].value, Some(10.0));
    }

    #[test]
    fn test_start_not_before_now_yields_no_points() {
        let t = at("2024-03-01");
        assert!(average_series(&[], t, t).is_empty());
    }
}
