use std::collections::HashSet;

use iracing_team_stats::analyzers::averaging::average_series;
use iracing_team_stats::analyzers::laps::{laps_for_driver, rank_laps};
use iracing_team_stats::analyzers::types::{MemberSeries, TimeSample};
use iracing_team_stats::charts;
use iracing_team_stats::data::Lap;

#[test]
fn test_full_lap_pipeline() {
    let raw = include_str!("fixtures/lap_chunk.json");
    let chunk: Vec<Lap> = serde_json::from_str(raw).expect("Failed to parse lap chunk");

    let class_ids: HashSet<u64> = [505047, 779960].into_iter().collect();
    let ranked = rank_laps(&[chunk], &class_ids, true);

    // Out-lap and out-of-class records are gone; two drivers over three laps.
    assert_eq!(ranked.len(), 6);

    let mine = laps_for_driver(&ranked, 505047);
    assert_eq!(mine.len(), 3);
    let positions: Vec<u32> = mine.iter().map(|r| r.class_position).collect();
    assert_eq!(positions, vec![1, 2, 1]);

    let laptime = charts::laptime_chart(&mine, "Lap times").expect("laptime chart");
    let position = charts::position_chart(&mine, "Position").expect("position chart");
    assert_eq!(laptime.pointer("/data/labels/0").unwrap(), 1);
    assert_eq!(
        position.pointer("/data/datasets/0/data/1").unwrap(),
        &serde_json::json!(2)
    );
}

#[test]
fn test_average_pipeline_renders_chart() {
    let start = "2024-01-01T00:00:00Z".parse().unwrap();
    let now = "2024-01-22T00:00:00Z".parse().unwrap();

    let member = MemberSeries::new(vec![
        TimeSample {
            timestamp: "2024-01-05T00:00:00Z".parse().unwrap(),
            value: 1500.0,
        },
        TimeSample {
            timestamp: "2024-01-19T00:00:00Z".parse().unwrap(),
            value: 1550.0,
        },
    ]);

    let points = average_series(&[member, MemberSeries::default()], start, now);
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].value, Some(1500.0));
    assert_eq!(points[2].value, Some(1550.0));

    let chart = charts::average_chart(&points, "average ir");
    assert_eq!(
        chart.pointer("/data/datasets/0/data/0/x").unwrap(),
        "2024-01-01"
    );
    assert_eq!(
        chart.pointer("/data/datasets/0/data/0/y").unwrap(),
        &serde_json::json!(1500.0)
    );
}
