//! Chart specification builders.
//!
//! Produces chart.js-shaped JSON documents for the rendering service from
//! already-computed projections. Nothing here touches raw upstream payloads,
//! and nothing here performs I/O.

use serde::Serialize;
use serde_json::{Value, json};

use crate::analyzers::laps::{has_timed_lap, position_extent, timed_lap_extent};
use crate::analyzers::types::{AveragePoint, RankedLap};
use crate::format::format_lap_time;
use crate::stats::ActivityCount;

const LINE_COLOR: &str = "#404090";
const INCIDENT_COLOR: &str = "#F00";
const POINT_COLOR: &str = "#000";

/// Axis margin around the lap-time extent, in raw lap-time units (2 s).
const LAP_TIME_PAD: i64 = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Plain bar chart with one anonymous dataset and centered value labels.
pub fn bar_chart(labels: &[String], data: &[f64], title: &str) -> Value {
    json!({
        "type": "bar",
        "data": { "labels": labels, "datasets": [{ "data": data }] },
        "options": {
            "legend": { "display": false },
            "title": { "display": true, "text": title },
            "plugins": {
                "datalabels": {
                    "anchor": "center",
                    "align": "center",
                    "color": "#fff",
                    "font": { "weight": "normal" }
                }
            }
        }
    })
}

/// Stacked bar chart over labelled datasets.
pub fn stacked_chart(labels: &[String], datasets: &[Dataset], title: &str) -> Value {
    json!({
        "type": "bar",
        "data": { "labels": labels, "datasets": datasets },
        "options": {
            "plugins": { "datalabels": { "color": "#FFF" } },
            "title": { "display": true, "text": title },
            "scales": {
                "xAxes": [{ "stacked": true }],
                "yAxes": [{ "display": false, "stacked": true }]
            }
        }
    })
}

/// Time-axis line chart over the weekly average series. Points without a
/// value become nulls, which the renderer tolerates as gaps.
pub fn average_chart(points: &[AveragePoint], title: &str) -> Value {
    let data: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "x": p.timestamp.format("%Y-%m-%d").to_string(),
                "y": p.value.map(f64::round),
            })
        })
        .collect();
    json!({
        "type": "line",
        "data": { "datasets": [{ "lineTension": 0.1, "pointRadius": 0, "data": data }] },
        "options": {
            "legend": { "display": false },
            "title": { "display": true, "text": title },
            "scales": { "xAxes": [{ "type": "time" }] }
        }
    })
}

fn lap_labels(laps: &[RankedLap]) -> Vec<u32> {
    laps.iter().map(|r| r.lap.lap_number).collect()
}

fn point_colors(laps: &[RankedLap]) -> Vec<&'static str> {
    laps.iter()
        .map(|r| {
            if r.lap.incident {
                INCIDENT_COLOR
            } else {
                POINT_COLOR
            }
        })
        .collect()
}

/// Lap-time line chart for one driver's laps, with the time axis padded 2 s
/// around the valid extent and incident laps marked red. `None` when no lap
/// carries a valid time: there is nothing to scale the axis from.
pub fn laptime_chart(laps: &[RankedLap], title: &str) -> Option<Value> {
    let (fastest, slowest) = timed_lap_extent(laps)?;
    let colors = point_colors(laps);
    let times: Vec<String> = laps
        .iter()
        .map(|r| format_lap_time(r.lap.lap_time, 0))
        .collect();
    Some(json!({
        "type": "line",
        "data": {
            "labels": lap_labels(laps),
            "datasets": [{
                "type": "line",
                "fill": false,
                "borderColor": LINE_COLOR,
                "backgroundColor": "rgba(0,0,0,0)",
                "pointBorderColor": colors,
                "pointBackgroundColor": colors,
                "data": times,
            }]
        },
        "options": {
            "legend": { "display": false },
            "scales": {
                "yAxes": [{
                    "position": "left",
                    "type": "time",
                    "time": {
                        "parser": "m:s.SSS",
                        "unit": "second",
                        "min": format_lap_time(fastest, -LAP_TIME_PAD),
                        "max": format_lap_time(slowest, LAP_TIME_PAD),
                        "displayFormats": { "second": "mm:ss" }
                    }
                }]
            },
            "title": { "display": true, "text": title }
        }
    }))
}

/// Class-position line chart for one driver's laps, axis reversed so leading
/// draws on top and padded one position on each side. Shares the lap-time
/// sentinel: a race with no timed lap gets no charts at all.
pub fn position_chart(laps: &[RankedLap], title: &str) -> Option<Value> {
    if !has_timed_lap(laps) {
        return None;
    }
    let (best, worst) = position_extent(laps)?;
    let colors = point_colors(laps);
    let positions: Vec<u32> = laps.iter().map(|r| r.class_position).collect();
    Some(json!({
        "type": "line",
        "data": {
            "labels": lap_labels(laps),
            "datasets": [{
                "type": "line",
                "fill": false,
                "borderColor": LINE_COLOR,
                "backgroundColor": "rgba(0,0,0,0)",
                "pointBorderColor": colors,
                "pointBackgroundColor": colors,
                "data": positions,
            }]
        },
        "options": {
            "legend": { "display": false },
            "scales": {
                "yAxes": [{
                    "ticks": {
                        "stepSize": 1,
                        "reverse": true,
                        "min": best.saturating_sub(1),
                        "max": worst + 1
                    }
                }]
            },
            "title": { "display": true, "text": title }
        }
    }))
}

/// Stacked-dataset projection of member activity. Members without any
/// activity are omitted, as are event types nobody used.
pub fn activity_datasets(counts: &[ActivityCount]) -> (Vec<String>, Vec<Dataset>) {
    let active: Vec<&ActivityCount> = counts.iter().filter(|c| c.has_activity()).collect();
    let labels: Vec<String> = active.iter().map(|c| c.member.clone()).collect();

    let columns: [(&str, fn(&ActivityCount) -> usize); 5] = [
        ("Race", |c| c.races),
        ("Practice", |c| c.practices),
        ("Qualify", |c| c.qualifyings),
        ("Hosted", |c| c.hosted),
        ("Time Trial", |c| c.time_trials),
    ];
    let datasets = columns
        .into_iter()
        .map(|(label, pick)| Dataset {
            label: label.to_string(),
            data: active.iter().map(|c| pick(c) as f64).collect(),
        })
        .filter(|d| d.data.iter().any(|v| *v > 0.0))
        .collect();

    (labels, datasets)
}

/// Projects `(license group, safety rating)` pairs onto stacked R..A
/// datasets: full bars below the member's group, the member's safety rating
/// in their own group's dataset, zeros above.
pub fn license_stack(entries: &[(u32, f64)]) -> Vec<Dataset> {
    const GROUPS: [&str; 5] = ["R", "D", "C", "B", "A"];
    const FULL_BAR: f64 = 5.0;

    let mut datasets: Vec<Dataset> = GROUPS
        .iter()
        .map(|g| Dataset {
            label: g.to_string(),
            data: Vec::with_capacity(entries.len()),
        })
        .collect();

    for (group, rating) in entries {
        let own = (*group as usize).clamp(1, GROUPS.len()) - 1;
        for (i, dataset) in datasets.iter_mut().enumerate() {
            let value = match i.cmp(&own) {
                std::cmp::Ordering::Less => FULL_BAR,
                std::cmp::Ordering::Equal => *rating,
                std::cmp::Ordering::Greater => 0.0,
            };
            dataset.data.push(value);
        }
    }
    datasets
}
