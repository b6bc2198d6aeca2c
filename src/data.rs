//! Wire models for the iRacing `/data` API.
//!
//! Most endpoints answer with a small envelope pointing at a pre-signed
//! download (`link`) or a set of chunk files; the actual payload is fetched
//! separately. The models here cover only the fields the reports read.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

pub const SIMSESSION_RACE: &str = "RACE";
pub const SIMSESSION_QUALIFY: &str = "QUALIFY";

/// Sentinel used by the API for "no valid time".
pub const NO_TIME: i64 = -1;

/// Envelope for endpoints that answer with a single pre-signed download link.
#[derive(Debug, Deserialize)]
pub struct LinkResponse {
    pub link: String,
}

/// Pagination info for chunked result downloads. Each chunk file resolves to
/// a JSON array; chunk boundaries carry no ordering guarantee.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkInfo {
    #[serde(default)]
    pub rows: u64,
    pub base_download_url: String,
    pub chunk_file_names: Vec<String>,
}

impl ChunkInfo {
    pub fn chunk_urls(&self) -> Vec<String> {
        self.chunk_file_names
            .iter()
            .map(|name| format!("{}{}", self.base_download_url, name))
            .collect()
    }
}

/// Envelope around an optional [`ChunkInfo`]; absent when the subsession has
/// no downloadable data.
#[derive(Debug, Deserialize)]
pub struct ChunkedResponse {
    pub chunk_info: Option<ChunkInfo>,
}

/// `search_series` / `search_hosted` wrap their chunk info one level deeper.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub data: ChunkedResponse,
}

/// One raw lap record exactly as downloaded from a lap chart data chunk.
///
/// `lap_time` is in ten-thousandths of a second, or [`NO_TIME`] when the lap
/// had no valid time (off-track, tow, retirement).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lap {
    pub cust_id: u64,
    pub lap_number: u32,
    #[serde(default = "no_time")]
    pub lap_time: i64,
    #[serde(default)]
    pub lap_position: u32,
    #[serde(default)]
    pub incident: bool,
    #[serde(default)]
    pub personal_best_lap: bool,
    #[serde(default)]
    pub fastest_lap: bool,
    #[serde(default)]
    pub lap_events: Vec<String>,
}

fn no_time() -> i64 {
    NO_TIME
}

#[derive(Debug, Clone, Deserialize)]
pub struct License {
    pub category: String,
    pub group_id: u32,
    #[serde(default)]
    pub irating: i64,
    #[serde(default)]
    pub safety_rating: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterMember {
    pub cust_id: u64,
    pub display_name: String,
    #[serde(default)]
    pub licenses: Vec<License>,
}

impl RosterMember {
    pub fn license(&self, category: &str) -> Option<&License> {
        self.licenses.iter().find(|l| l.category == category)
    }
}

/// Payload behind `/data/team/get`'s download link.
#[derive(Debug, Deserialize)]
pub struct TeamData {
    pub roster: Vec<RosterMember>,
}

/// One point of a member's rating history (`/data/member/chart_data`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RatingPoint {
    pub when: NaiveDate,
    pub value: f64,
}

impl RatingPoint {
    /// The upstream reports calendar dates; sample instants are their UTC
    /// midnights.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.when.and_time(NaiveTime::MIN).and_utc()
    }
}

#[derive(Debug, Deserialize)]
pub struct RatingHistory {
    #[serde(default)]
    pub data: Vec<RatingPoint>,
}

/// Series catalog entry (`/data/series/get`); maps a series to its license
/// category (road, oval, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesInfo {
    pub series_id: u32,
    pub category: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackInfo {
    #[serde(default)]
    pub track_name: String,
}

/// One row from a recent-race search chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct RaceRow {
    pub subsession_id: u64,
    #[serde(default)]
    pub series_id: u32,
    #[serde(default)]
    pub series_name: String,
    #[serde(default)]
    pub series_short_name: String,
    #[serde(default)]
    pub event_type_name: String,
    pub session_start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub car_name: String,
    #[serde(default)]
    pub car_class_short_name: String,
    #[serde(default)]
    pub event_strength_of_field: i64,
    #[serde(default)]
    pub starting_position_in_class: i64,
    #[serde(default)]
    pub finish_position_in_class: i64,
    #[serde(default)]
    pub laps_complete: u32,
    #[serde(default)]
    pub laps_led: u32,
    #[serde(default)]
    pub incidents: u32,
    #[serde(default)]
    pub track: TrackInfo,
}

/// One participant row of a subsession result. Team events nest the actual
/// driver rows inside `driver_results`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultRow {
    #[serde(default)]
    pub cust_id: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub car_class_id: u32,
    #[serde(default)]
    pub finish_position_in_class: i64,
    #[serde(default = "no_time")]
    pub best_lap_time: i64,
    #[serde(default = "no_time")]
    pub average_lap: i64,
    #[serde(default = "no_time")]
    pub best_qual_lap_time: i64,
    #[serde(default)]
    pub oldi_rating: i64,
    #[serde(default)]
    pub newi_rating: i64,
    #[serde(default)]
    pub old_sub_level: i64,
    #[serde(default)]
    pub new_sub_level: i64,
    #[serde(default)]
    pub old_license_level: u32,
    #[serde(default)]
    pub new_license_level: u32,
    #[serde(default)]
    pub laps_complete: u32,
    #[serde(default)]
    pub laps_led: u32,
    #[serde(default)]
    pub incidents: u32,
    #[serde(default)]
    pub driver_results: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
pub struct SimSession {
    pub simsession_name: String,
    #[serde(default)]
    pub results: Vec<ResultRow>,
}

/// Payload behind `/data/results/get`'s download link.
#[derive(Debug, Deserialize)]
pub struct Subsession {
    #[serde(default)]
    pub driver_changes: bool,
    pub session_results: Vec<SimSession>,
}

impl Subsession {
    pub fn session(&self, name: &str) -> Option<&SimSession> {
        self.session_results.iter().find(|s| s.simsession_name == name)
    }
}

/// The focus driver's rows, resolved once at ingestion.
///
/// Team events report teams at the top level with per-driver rows nested in
/// `driver_results`; solo events report driver rows directly. The shape is
/// decided here exactly once so downstream code never re-checks it.
#[derive(Debug, Clone)]
pub enum RaceResult {
    Team {
        qualifying: Option<ResultRow>,
        race: ResultRow,
    },
    Solo {
        qualifying: Option<ResultRow>,
        race: ResultRow,
    },
}

impl RaceResult {
    /// Returns `None` when the driver has no race row in the subsession.
    pub fn resolve(subsession: &Subsession, cust_id: u64) -> Option<Self> {
        let race_rows = &subsession.session(SIMSESSION_RACE)?.results;
        let qual_rows = subsession
            .session(SIMSESSION_QUALIFY)
            .map(|s| s.results.as_slice())
            .unwrap_or(&[]);

        if subsession.driver_changes {
            let race = driver_in_teams(race_rows, cust_id)?;
            let qualifying = driver_in_teams(qual_rows, cust_id);
            Some(RaceResult::Team { qualifying, race })
        } else {
            let race = race_rows.iter().find(|r| r.cust_id == cust_id)?.clone();
            let qualifying = qual_rows.iter().find(|r| r.cust_id == cust_id).cloned();
            Some(RaceResult::Solo { qualifying, race })
        }
    }

    pub fn race(&self) -> &ResultRow {
        match self {
            RaceResult::Team { race, .. } | RaceResult::Solo { race, .. } => race,
        }
    }

    pub fn qualifying(&self) -> Option<&ResultRow> {
        match self {
            RaceResult::Team { qualifying, .. } | RaceResult::Solo { qualifying, .. } => {
                qualifying.as_ref()
            }
        }
    }
}

fn driver_in_teams(rows: &[ResultRow], cust_id: u64) -> Option<ResultRow> {
    rows.iter()
        .flat_map(|team| team.driver_results.iter())
        .find(|d| d.cust_id == cust_id)
        .cloned()
}

/// Everything the race summary needs about a subsession, derived relative to
/// the focus driver's car class.
#[derive(Debug, Clone)]
pub struct DriverRaceDetails {
    pub result: RaceResult,
    pub winner: Option<ResultRow>,
    pub pole_position: Option<ResultRow>,
    pub fastest_lap: Option<ResultRow>,
    pub class_participants: Vec<ResultRow>,
    pub strength_of_field: Option<f64>,
}

impl DriverRaceDetails {
    pub fn from_subsession(subsession: &Subsession, cust_id: u64) -> Option<Self> {
        let result = RaceResult::resolve(subsession, cust_id)?;
        let class_id = result.race().car_class_id;

        let race_rows = &subsession.session(SIMSESSION_RACE)?.results;
        let qual_rows = subsession
            .session(SIMSESSION_QUALIFY)
            .map(|s| s.results.as_slice())
            .unwrap_or(&[]);

        let winner = race_rows
            .iter()
            .find(|r| r.finish_position_in_class == 0 && r.car_class_id == class_id)
            .cloned();
        let pole_position = qual_rows
            .iter()
            .find(|r| r.finish_position_in_class == 0 && r.car_class_id == class_id)
            .cloned();
        let fastest_lap = race_rows
            .iter()
            .filter(|r| r.best_lap_time != NO_TIME && r.car_class_id == class_id)
            .min_by_key(|r| r.best_lap_time)
            .cloned();
        let class_participants: Vec<ResultRow> = race_rows
            .iter()
            .filter(|r| r.car_class_id == class_id)
            .cloned()
            .collect();
        let strength_of_field = crate::stats::strength_of_field(&class_participants);

        Some(DriverRaceDetails {
            result,
            winner,
            pole_position,
            fastest_lap,
            class_participants,
            strength_of_field,
        })
    }

    /// Customer ids of everyone in the focus driver's class, with team rows
    /// expanded to their drivers.
    pub fn class_participant_ids(&self) -> HashSet<u64> {
        self.class_participants
            .iter()
            .flat_map(|row| {
                if row.driver_results.is_empty() {
                    vec![row.cust_id]
                } else {
                    row.driver_results.iter().map(|d| d.cust_id).collect()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_defaults() {
        let lap: Lap = serde_json::from_str(r#"{"cust_id": 1, "lap_number": 3}"#).unwrap();
        assert_eq!(lap.lap_time, NO_TIME);
        assert!(!lap.incident);
        assert!(lap.lap_events.is_empty());
    }

    #[test]
    fn test_chunk_urls() {
        let info = ChunkInfo {
            rows: 2,
            base_download_url: "https://cdn.example/laps/".to_string(),
            chunk_file_names: vec!["a.json".to_string(), "b.json".to_string()],
        };
        assert_eq!(
            info.chunk_urls(),
            vec!["https://cdn.example/laps/a.json", "https://cdn.example/laps/b.json"]
        );
    }

    fn solo_subsession() -> Subsession {
        let row = |cust_id: u64, finish: i64, best: i64, old_ir: i64| ResultRow {
            cust_id,
            car_class_id: 7,
            finish_position_in_class: finish,
            best_lap_time: best,
            oldi_rating: old_ir,
            ..ResultRow::default()
        };
        Subsession {
            driver_changes: false,
            session_results: vec![
                SimSession {
                    simsession_name: SIMSESSION_QUALIFY.to_string(),
                    results: vec![row(10, 0, 900_000, 2000), row(20, 1, 910_000, 1500)],
                },
                SimSession {
                    simsession_name: SIMSESSION_RACE.to_string(),
                    results: vec![row(10, 1, 905_000, 2000), row(20, 0, 899_000, 1500)],
                },
            ],
        }
    }

    #[test]
    fn test_resolve_solo() {
        let details = DriverRaceDetails::from_subsession(&solo_subsession(), 10).unwrap();
        assert!(matches!(details.result, RaceResult::Solo { .. }));
        assert_eq!(details.result.race().cust_id, 10);
        assert_eq!(details.result.qualifying().unwrap().cust_id, 10);
        assert_eq!(details.winner.as_ref().unwrap().cust_id, 20);
        assert_eq!(details.pole_position.as_ref().unwrap().cust_id, 10);
        assert_eq!(details.fastest_lap.as_ref().unwrap().cust_id, 20);
        assert_eq!(details.strength_of_field, Some(1750.0));
        assert_eq!(details.class_participant_ids().len(), 2);
    }

    #[test]
    fn test_resolve_unknown_driver() {
        assert!(DriverRaceDetails::from_subsession(&solo_subsession(), 99).is_none());
    }

    #[test]
    fn test_resolve_team_race() {
        let driver = ResultRow {
            cust_id: 42,
            car_class_id: 3,
            newi_rating: 2100,
            ..ResultRow::default()
        };
        let team = ResultRow {
            cust_id: 0,
            car_class_id: 3,
            finish_position_in_class: 0,
            driver_results: vec![driver],
            ..ResultRow::default()
        };
        let subsession = Subsession {
            driver_changes: true,
            session_results: vec![SimSession {
                simsession_name: SIMSESSION_RACE.to_string(),
                results: vec![team],
            }],
        };

        let details = DriverRaceDetails::from_subsession(&subsession, 42).unwrap();
        assert!(matches!(details.result, RaceResult::Team { .. }));
        assert_eq!(details.result.race().newi_rating, 2100);
        assert!(details.result.qualifying().is_none());
        assert!(details.class_participant_ids().contains(&42));
    }
}
