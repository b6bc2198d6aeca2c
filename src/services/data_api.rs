//! Trait for the upstream racing statistics service.

use anyhow::Result;
use chrono::{DateTime, Utc};

use iracing_team_stats::data::{Lap, RaceRow, RatingPoint, RosterMember, SeriesInfo, Subsession};

/// Event type selector for race sessions in the search endpoints.
pub const EVENT_TYPE_RACE: u32 = 5;

/// Abstraction over the racing statistics API. Reports only ever see this
/// trait; the authenticated client lives in `infra::iracing`.
#[async_trait::async_trait]
pub trait DataApi: Send + Sync {
    /// Current roster of a team, licenses included.
    async fn team_roster(&self, team_id: u64) -> Result<Vec<RosterMember>>;

    /// A member's recent sessions finishing after `since`, optionally
    /// restricted to the given event types (see [`EVENT_TYPE_RACE`]).
    async fn recent_races(
        &self,
        cust_id: u64,
        event_types: &[u32],
        since: DateTime<Utc>,
    ) -> Result<Vec<RaceRow>>;

    /// Number of hosted sessions a member ran since `since`.
    async fn hosted_race_count(&self, cust_id: u64, since: DateTime<Utc>) -> Result<usize>;

    /// A member's rating history for one license category.
    async fn rating_history(&self, cust_id: u64, category_id: u32) -> Result<Vec<RatingPoint>>;

    /// Series-to-category mapping from the series catalog.
    async fn race_categories(&self) -> Result<Vec<SeriesInfo>>;

    /// Full results of one subsession.
    async fn subsession(&self, subsession_id: u64) -> Result<Subsession>;

    /// All lap chunks of a subsession's main simsession, one inner vector
    /// per downloaded chunk file. Empty when no lap data is published.
    async fn lap_chunks(&self, subsession_id: u64) -> Result<Vec<Vec<Lap>>>;
}
