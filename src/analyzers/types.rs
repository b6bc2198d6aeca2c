use chrono::{DateTime, Utc};

use crate::data::Lap;

/// One observed measurement for one member at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A member's rating history, held for the duration of one averaging run.
/// Usually timestamp-ascending, but the averaging code never relies on it.
#[derive(Debug, Clone, Default)]
pub struct MemberSeries {
    pub samples: Vec<TimeSample>,
}

impl MemberSeries {
    pub fn new(samples: Vec<TimeSample>) -> Self {
        Self { samples }
    }
}

/// One point of the combined weekly series. `value` is `None` when no member
/// had a usable sample at this instant; renderers map that to a null point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragePoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// A raw lap record together with its derived rank among class participants
/// present at that lap.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedLap {
    pub lap: Lap,
    /// 1-based; contiguous per lap number across the class.
    pub class_position: u32,
}
