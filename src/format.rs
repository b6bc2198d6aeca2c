//! Display formatting for lap times, licenses and rating deltas.

use crate::data::{NO_TIME, ResultRow};

/// Formats a raw lap time (ten-thousandths of a second) as `mm:ss.SSS`.
///
/// `pad` shifts the value before formatting, which the lap chart uses for
/// axis margins; the shifted value is clamped at zero. Invalid times render
/// as the empty string.
pub fn format_lap_time(time: i64, pad: i64) -> String {
    if time == NO_TIME {
        return String::new();
    }
    let ms = (time + pad).max(0) / 10;
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// License class letter for a numeric license level.
pub fn license_class(level: u32) -> &'static str {
    match level {
        0..=4 => "R",
        5..=8 => "D",
        9..=12 => "C",
        13..=16 => "B",
        17..=20 => "A",
        _ => "P",
    }
}

/// Safety sub-level (reported in hundredths) as `x.yz`.
pub fn format_sub_level(sub_level: i64) -> String {
    format!("{:.2}", sub_level as f64 / 100.0)
}

/// Signed integer delta; positive values get an explicit `+`.
pub fn format_signed(value: i64) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

fn format_signed_hundredths(delta: i64) -> String {
    let value = delta as f64 / 100.0;
    if delta > 0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

/// License summary for a race result: `B 3.42 (+0.17)` while the class is
/// unchanged, or old and new rating with a promotion/demotion arrow.
pub fn format_license(row: &ResultRow) -> String {
    let new = license_class(row.new_license_level);
    let old = license_class(row.old_license_level);
    if new == old {
        format!(
            "{new} {} ({})",
            format_sub_level(row.new_sub_level),
            format_signed_hundredths(row.new_sub_level - row.old_sub_level)
        )
    } else {
        let arrow = if row.new_license_level > row.old_license_level {
            "↗"
        } else {
            "↘"
        };
        format!(
            "{old} {} {arrow} {new} {}",
            format_sub_level(row.old_sub_level),
            format_sub_level(row.new_sub_level)
        )
    }
}

/// iRating after a race with its delta: `2105 (+34)`.
pub fn format_rating(row: &ResultRow) -> String {
    format!(
        "{} ({})",
        row.newi_rating,
        format_signed(row.newi_rating - row.oldi_rating)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lap_time() {
        // 1:23.456 in ten-thousandths of a second
        assert_eq!(format_lap_time(834_560, 0), "01:23.456");
        assert_eq!(format_lap_time(834_560, 20_000), "01:25.456");
        assert_eq!(format_lap_time(10_000, -20_000), "00:00.000");
        assert_eq!(format_lap_time(NO_TIME, 0), "");
    }

    #[test]
    fn test_license_class_boundaries() {
        assert_eq!(license_class(4), "R");
        assert_eq!(license_class(5), "D");
        assert_eq!(license_class(12), "C");
        assert_eq!(license_class(16), "B");
        assert_eq!(license_class(20), "A");
        assert_eq!(license_class(21), "P");
    }

    #[test]
    fn test_format_license_same_class() {
        let row = ResultRow {
            old_license_level: 14,
            new_license_level: 15,
            old_sub_level: 325,
            new_sub_level: 342,
            ..ResultRow::default()
        };
        assert_eq!(format_license(&row), "B 3.42 (+0.17)");
    }

    #[test]
    fn test_format_license_promotion() {
        let row = ResultRow {
            old_license_level: 16,
            new_license_level: 17,
            old_sub_level: 499,
            new_sub_level: 301,
            ..ResultRow::default()
        };
        assert_eq!(format_license(&row), "B 4.99 ↗ A 3.01");
    }

    #[test]
    fn test_format_rating() {
        let row = ResultRow {
            oldi_rating: 2071,
            newi_rating: 2105,
            ..ResultRow::default()
        };
        assert_eq!(format_rating(&row), "2105 (+34)");

        let down = ResultRow {
            oldi_rating: 2105,
            newi_rating: 2071,
            ..ResultRow::default()
        };
        assert_eq!(format_rating(&down), "2071 (-34)");
    }
}
