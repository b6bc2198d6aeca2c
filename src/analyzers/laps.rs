//! Per-lap class position reconstruction from chunked lap feeds.

use std::collections::HashSet;

use crate::data::{Lap, NO_TIME};

use super::types::RankedLap;

/// Reconstructs class positions from raw lap chunks.
///
/// Chunks are a pagination artifact and carry no ordering, so all records are
/// concatenated first, filtered to `class_ids` (and, when `skip_out_lap` is
/// set, stripped of the pre-race `lap_number == 0` records), then stably
/// sorted by `(lap_number, lap_position)` into a fresh vector; the input is
/// never reordered. Positions are assigned in one scan: a record whose
/// predecessor has a different lap number opens that lap at position 1, and
/// every record sharing its predecessor's lap number takes the predecessor's
/// position plus one. `lap_position` is the tie-break exactly as reported
/// upstream; lap times play no part in the ranking.
pub fn rank_laps(
    chunks: &[Vec<Lap>],
    class_ids: &HashSet<u64>,
    skip_out_lap: bool,
) -> Vec<RankedLap> {
    let mut laps: Vec<Lap> = chunks
        .iter()
        .flatten()
        .filter(|l| class_ids.contains(&l.cust_id))
        .filter(|l| !skip_out_lap || l.lap_number != 0)
        .cloned()
        .collect();
    laps.sort_by_key(|l| (l.lap_number, l.lap_position));

    let mut ranked: Vec<RankedLap> = Vec::with_capacity(laps.len());
    for lap in laps {
        let class_position = match ranked.last() {
            Some(prev) if prev.lap.lap_number == lap.lap_number => prev.class_position + 1,
            _ => 1,
        };
        ranked.push(RankedLap { lap, class_position });
    }
    ranked
}

/// The focus driver's rows out of the full ranked table. The table itself
/// stays available for whole-class consumers.
pub fn laps_for_driver(ranked: &[RankedLap], cust_id: u64) -> Vec<RankedLap> {
    ranked
        .iter()
        .filter(|r| r.lap.cust_id == cust_id)
        .cloned()
        .collect()
}

/// True when at least one record carries a valid lap time. When false there
/// is no lap-time chart to derive, which is an expected outcome rather than
/// an error.
pub fn has_timed_lap(laps: &[RankedLap]) -> bool {
    laps.iter().any(|r| r.lap.lap_time != NO_TIME)
}

/// Fastest and slowest valid lap times, or `None` when nothing was timed.
pub fn timed_lap_extent(laps: &[RankedLap]) -> Option<(i64, i64)> {
    let mut times = laps
        .iter()
        .map(|r| r.lap.lap_time)
        .filter(|t| *t != NO_TIME);
    let first = times.next()?;
    Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

/// Best and worst class positions across the given laps, or `None` when the
/// slice is empty. Untimed laps still count: a driver holds a position even
/// on a lap without a valid time.
pub fn position_extent(laps: &[RankedLap]) -> Option<(u32, u32)> {
    let mut positions = laps.iter().map(|r| r.class_position);
    let first = positions.next()?;
    Some(positions.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
}
