//! Report assembly: the weekly team report and single-race summaries.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use iracing_team_stats::analyzers::averaging::average_series;
use iracing_team_stats::analyzers::laps::{has_timed_lap, laps_for_driver, rank_laps};
use iracing_team_stats::analyzers::types::{MemberSeries, TimeSample};
use iracing_team_stats::charts;
use iracing_team_stats::config::{self, TeamConfig};
use iracing_team_stats::data::{DriverRaceDetails, RaceRow, RaceResult, RosterMember};
use iracing_team_stats::format::{format_lap_time, format_license, format_rating};
use iracing_team_stats::stats::{self, ActivityCount};

use crate::services::chart_api::ChartApi;
use crate::services::data_api::{DataApi, EVENT_TYPE_RACE};
use crate::services::messaging::{
    Embed, EmbedField, EmbedFooter, MessagingSink, WebhookMessage,
};

const AVATAR_URL: &str = "https://cdn-icons-png.flaticon.com/512/4778/4778417.png";

/// Everything a report run needs, wired once in `main` and shared across
/// teams. All collaborators are injected; nothing here owns global state.
pub struct Reporter {
    pub api: Arc<dyn DataApi>,
    pub charts: Arc<dyn ChartApi>,
    pub sink: Arc<dyn MessagingSink>,
    pub concurrency: usize,
}

/// One member's fetched data for the report window.
struct MemberWindow {
    member: RosterMember,
    all_events: Vec<RaceRow>,
    races: Vec<RaceRow>,
    hosted: usize,
    history: Vec<TimeSample>,
}

impl Reporter {
    /// Builds and posts the weekly report for one team: activity, popular
    /// series, safety and iRating standings, the historic average line, and
    /// last week's rating changes.
    #[tracing::instrument(skip(self, team), fields(team = %team.team_name))]
    pub async fn weekly_report(
        &self,
        team: &TeamConfig,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(webhook_url) = team.webhook_url() else {
            warn!(env = %team.webhook_env, "No webhook configured, skipping team");
            return Ok(());
        };
        let category_id = config::category_id(category)
            .with_context(|| format!("unknown license category {category}"))?;

        let roster = self.api.team_roster(team.team_id).await?;
        info!(members = roster.len(), "Roster fetched");

        let windows = self.fetch_member_windows(&roster, category_id, now).await;

        let mut chart_docs: Vec<Value> = Vec::new();

        let counts: Vec<ActivityCount> = windows
            .iter()
            .map(|w| ActivityCount::from_races(&w.member.display_name, &w.all_events, w.hosted))
            .collect();
        let (labels, datasets) = charts::activity_datasets(&counts);
        chart_docs.push(charts::stacked_chart(
            &labels,
            &datasets,
            &format!("Most active {}s", team.member_name),
        ));

        if !team.activity_only {
            let all_races: Vec<RaceRow> = windows.iter().flat_map(|w| w.races.clone()).collect();
            let series = stats::series_counts(&all_races);
            let labels: Vec<String> = series.iter().map(|(name, _)| name.clone()).collect();
            let data: Vec<f64> = series.iter().map(|(_, count)| *count as f64).collect();
            chart_docs.push(charts::bar_chart(&labels, &data, "Series last week"));

            let licensed: Vec<_> = roster
                .iter()
                .filter_map(|m| m.license(category).map(|l| (m, l)))
                .collect();
            let labels: Vec<String> = licensed
                .iter()
                .map(|(m, _)| m.display_name.clone())
                .collect();
            let entries: Vec<(u32, f64)> = licensed
                .iter()
                .map(|(_, l)| (l.group_id, l.safety_rating))
                .collect();
            chart_docs.push(charts::stacked_chart(
                &labels,
                &charts::license_stack(&entries),
                &format!("{}s {category} safety", team.member_name),
            ));

            let ratings: Vec<f64> = licensed.iter().map(|(_, l)| l.irating as f64).collect();
            chart_docs.push(charts::bar_chart(
                &labels,
                &ratings,
                &format!("{} {category} iRating", team.team_name),
            ));

            let history_start = now - Duration::days(365);
            let member_series: Vec<MemberSeries> = windows
                .iter()
                .map(|w| MemberSeries::new(w.history.clone()))
                .collect();
            let points = average_series(&member_series, history_start, now);
            chart_docs.push(charts::average_chart(
                &points,
                &format!("{} {category} average ir", team.team_name),
            ));

            let improvement = self.improvement_data(&windows, category).await?;
            let labels: Vec<String> = improvement.iter().map(|(name, _)| name.clone()).collect();
            let data: Vec<f64> = improvement.iter().map(|(_, change)| *change as f64).collect();
            chart_docs.push(charts::bar_chart(
                &labels,
                &data,
                &format!("{} {category} ir-change last week", team.team_name),
            ));
        }

        let mut embeds = Vec::new();
        for doc in &chart_docs {
            match self.charts.render(doc).await {
                Ok(url) => embeds.push(Embed::image(url)),
                Err(e) => error!(error = %e, "Chart render failed"),
            }
        }

        let message = WebhookMessage {
            username: Some(format!("{} stats", team.team_name)),
            avatar_url: Some(AVATAR_URL.to_string()),
            content: Some("Weekly statistics".to_string()),
            embeds,
        };
        self.sink.post(&webhook_url, &message).await?;
        info!("Weekly report posted");
        Ok(())
    }

    /// Fetches every member's report window with bounded concurrency. A
    /// member whose fetches fail contributes empty data instead of sinking
    /// the whole report.
    async fn fetch_member_windows(
        &self,
        roster: &[RosterMember],
        category_id: u32,
        now: DateTime<Utc>,
    ) -> Vec<MemberWindow> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let week_ago = now.date_naive().and_time(NaiveTime::MIN).and_utc() - Duration::weeks(1);
        let history_start = now - Duration::days(365);

        let mut tasks = Vec::new();
        for member in roster {
            let api = Arc::clone(&self.api);
            let sem = Arc::clone(&semaphore);
            let member = member.clone();

            let span = tracing::info_span!(
                "member_window",
                cust_id = member.cust_id,
                name = %member.display_name,
            );

            tasks.push(tokio::spawn(
                async move {
                    let _permit = sem.acquire().await.ok()?;

                    let all_events = match api.recent_races(member.cust_id, &[], week_ago).await {
                        Ok(rows) => rows,
                        Err(e) => {
                            error!(error = %e, "Recent session fetch failed");
                            Vec::new()
                        }
                    };
                    let hosted = match api.hosted_race_count(member.cust_id, week_ago).await {
                        Ok(count) => count,
                        Err(e) => {
                            error!(error = %e, "Hosted session fetch failed");
                            0
                        }
                    };
                    let history: Vec<TimeSample> =
                        match api.rating_history(member.cust_id, category_id).await {
                            Ok(points) => points
                                .into_iter()
                                .map(|p| TimeSample {
                                    timestamp: p.timestamp(),
                                    value: p.value,
                                })
                                .filter(|s| s.timestamp > history_start)
                                .collect(),
                            Err(e) => {
                                error!(error = %e, "Rating history fetch failed");
                                Vec::new()
                            }
                        };

                    let races = all_events
                        .iter()
                        .filter(|r| r.event_type_name == "Race")
                        .cloned()
                        .collect();

                    Some(MemberWindow {
                        member,
                        all_events,
                        races,
                        hosted,
                        history,
                    })
                }
                .instrument(span),
            ));
        }

        let mut windows = Vec::new();
        for task in tasks {
            if let Ok(Some(window)) = task.await {
                windows.push(window);
            }
        }
        windows
    }

    /// Per-member iRating change over last week's category races, ordered by
    /// session start. Members without qualifying races are omitted.
    async fn improvement_data(
        &self,
        windows: &[MemberWindow],
        category: &str,
    ) -> Result<Vec<(String, i64)>> {
        let categories = self.api.race_categories().await?;
        let category_series: HashSet<u32> = categories
            .iter()
            .filter(|s| s.category == category)
            .map(|s| s.series_id)
            .collect();

        let mut changes = Vec::new();
        for window in windows {
            let mut races: Vec<&RaceRow> = window
                .races
                .iter()
                .filter(|r| category_series.contains(&r.series_id))
                .collect();
            races.sort_by_key(|r| r.session_start_time);

            let mut results = Vec::new();
            for race in races {
                match self.api.subsession(race.subsession_id).await {
                    Ok(subsession) => {
                        if let Some(result) = RaceResult::resolve(&subsession, window.member.cust_id)
                        {
                            results.push(result.race().clone());
                        }
                    }
                    Err(e) => {
                        warn!(subsession_id = race.subsession_id, error = %e, "Skipping subsession")
                    }
                }
            }
            if let Some(change) = stats::rating_change(&results) {
                changes.push((window.member.display_name.clone(), change));
            }
        }
        Ok(changes)
    }

    /// Posts a result summary for one subsession and driver: a fields embed
    /// plus lap-time and class-position charts when the race produced any
    /// timed laps.
    #[tracing::instrument(skip(self, webhook_url))]
    pub async fn race_summary(
        &self,
        subsession_id: u64,
        cust_id: u64,
        webhook_url: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let subsession = self.api.subsession(subsession_id).await?;
        let Some(details) = DriverRaceDetails::from_subsession(&subsession, cust_id) else {
            info!("Driver has no result in subsession, nothing to post");
            return Ok(());
        };

        // The search row carries series/track/car names the result payload
        // lacks; its absence only costs cosmetics.
        let since = now - Duration::days(89);
        let row = match self
            .api
            .recent_races(cust_id, &[EVENT_TYPE_RACE], since)
            .await
        {
            Ok(rows) => rows.into_iter().find(|r| r.subsession_id == subsession_id),
            Err(e) => {
                warn!(error = %e, "Recent race lookup failed");
                None
            }
        };

        let mut embeds = vec![result_embed(&details, row.as_ref(), cust_id, subsession_id)];

        let chunks = self.api.lap_chunks(subsession_id).await?;
        let ranked = rank_laps(&chunks, &details.class_participant_ids(), true);
        let mine = laps_for_driver(&ranked, cust_id);
        if has_timed_lap(&mine) {
            let lap_charts = [
                charts::laptime_chart(&mine, "Lap times"),
                charts::position_chart(&mine, "Position"),
            ];
            for chart in lap_charts.into_iter().flatten() {
                match self.charts.render(&chart).await {
                    Ok(url) => embeds.push(Embed::image(url)),
                    Err(e) => error!(error = %e, "Chart render failed"),
                }
            }
        } else {
            info!("No timed laps, lap charts skipped");
        }

        let message = WebhookMessage {
            username: Some("racebot".to_string()),
            avatar_url: Some(AVATAR_URL.to_string()),
            content: None,
            embeds,
        };
        self.sink.post(webhook_url, &message).await?;
        info!("Race summary posted");
        Ok(())
    }
}

fn time_or_dash(time: i64) -> String {
    let formatted = format_lap_time(time, 0);
    if formatted.is_empty() {
        "-".to_string()
    } else {
        formatted
    }
}

fn result_embed(
    details: &DriverRaceDetails,
    row: Option<&RaceRow>,
    cust_id: u64,
    subsession_id: u64,
) -> Embed {
    let race = details.result.race();

    let mut fields = vec![EmbedField::inline(
        "Driver",
        format!("**{}**", race.display_name),
    )];

    if let Some(row) = row {
        fields.push(EmbedField::inline("Car", row.car_name.clone()));
        fields.push(EmbedField::inline("Class", row.car_class_short_name.clone()));
        fields.push(EmbedField::inline("Start", (row.starting_position_in_class + 1).to_string()));
    }
    if let Some(sof) = details.strength_of_field {
        fields.push(EmbedField::inline("SOF", (sof.round() as i64).to_string()));
    }
    fields.push(EmbedField::inline(
        "Position",
        (race.finish_position_in_class + 1).to_string(),
    ));
    fields.push(EmbedField::inline("Laps", race.laps_complete.to_string()));
    fields.push(EmbedField::inline("Laps led", race.laps_led.to_string()));
    fields.push(EmbedField::inline("Incidents", race.incidents.to_string()));
    fields.push(EmbedField::inline("Best lap", time_or_dash(race.best_lap_time)));
    fields.push(EmbedField::inline("Average lap", time_or_dash(race.average_lap)));

    let qualifying_time = details
        .result
        .qualifying()
        .map(|q| time_or_dash(q.best_qual_lap_time))
        .unwrap_or_else(|| "No time".to_string());
    fields.push(EmbedField::inline("Qualifying", qualifying_time));

    if let Some(pole) = &details.pole_position {
        fields.push(EmbedField::inline(
            "Pole position",
            format!("{} ({})", pole.display_name, time_or_dash(pole.best_qual_lap_time)),
        ));
    }
    if let Some(winner) = &details.winner {
        fields.push(EmbedField::inline(
            "Winner",
            format!("{} ({})", winner.display_name, time_or_dash(winner.average_lap)),
        ));
    }
    if let Some(fastest) = &details.fastest_lap {
        fields.push(EmbedField::inline(
            "Fastest lap",
            format!("{} ({})", fastest.display_name, time_or_dash(fastest.best_lap_time)),
        ));
    }
    fields.push(EmbedField::inline("License", format_license(race)));
    fields.push(EmbedField::inline("iRating", format_rating(race)));

    let title = row
        .map(|r| {
            let series = if r.series_short_name.is_empty() {
                r.series_name.as_str()
            } else {
                r.series_short_name.as_str()
            };
            format!("{} at {}", series, r.track.track_name)
        })
        .unwrap_or_else(|| "Race result".to_string());

    let footer = row.and_then(|r| r.start_time).map(|start| EmbedFooter {
        text: format!("Started: {}", start.format("%d.%m.%Y, %H:%M")),
    });

    Embed {
        title: Some(title),
        url: Some(format!(
            "https://members.iracing.com/membersite/member/EventResult.do?subsessionid={subsession_id}&custid={cust_id}"
        )),
        fields,
        image: None,
        footer,
    }
}
