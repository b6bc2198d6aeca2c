//! CLI entry point for the iRacing team statistics reporter.
//!
//! Provides subcommands for the weekly team report, one-off race summaries,
//! and roster inspection.

mod infra;
mod reports;
mod services;

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use iracing_team_stats::config::{self, load_teams};

use crate::infra::discord::DiscordWebhook;
use crate::infra::iracing::{Credentials, IracingClient};
use crate::infra::quickchart::QuickChartClient;
use crate::reports::Reporter;
use crate::services::data_api::DataApi;

#[derive(Parser)]
#[command(name = "iracing_team_stats")]
#[command(about = "Posts iRacing team statistics to Discord", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and post the weekly report for every configured team
    WeeklyReport {
        /// JSON file listing the teams to report on
        #[arg(short, long, default_value = "teams.json")]
        teams: String,

        /// Maximum number of concurrent member fetches
        #[arg(short, long, default_value_t = 5)]
        concurrency: usize,

        /// License category to report on
        #[arg(long, default_value = "road")]
        category: String,
    },
    /// Post a result summary for one subsession and driver
    RaceSummary {
        subsession_id: u64,
        cust_id: u64,

        /// Environment variable holding the target webhook URL
        #[arg(long, default_value = "DISCORD_WEBHOOK")]
        webhook_env: String,
    },
    /// Print a team's roster with licenses
    ListRoster {
        team_id: u64,

        /// License category to summarize
        #[arg(long, default_value = "road")]
        category: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/iracing_team_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("iracing_team_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::WeeklyReport {
            teams,
            concurrency,
            category,
        } => {
            let always_run = std::env::var("ALWAYS_RUN")
                .map(|v| v == "true")
                .unwrap_or(false);
            let now = Utc::now();
            if !config::report_due(now, always_run) {
                info!("Not the reporting day, set ALWAYS_RUN=true to override");
                return Ok(());
            }

            let teams = load_teams(Path::new(&teams))?;
            info!(teams = teams.len(), category = %category, "Starting weekly report run");

            let reporter = build_reporter(concurrency)?;
            for team in &teams {
                if let Err(e) = reporter.weekly_report(team, &category, now).await {
                    error!(team = %team.team_name, error = %e, "Weekly report failed");
                }
            }
        }
        Commands::RaceSummary {
            subsession_id,
            cust_id,
            webhook_env,
        } => {
            let webhook_url =
                std::env::var(&webhook_env).with_context(|| format!("{webhook_env} must be set"))?;
            let reporter = build_reporter(1)?;
            reporter
                .race_summary(subsession_id, cust_id, &webhook_url, Utc::now())
                .await?;
        }
        Commands::ListRoster { team_id, category } => {
            let api = IracingClient::new(Credentials::from_env()?)?;
            let roster = api.team_roster(team_id).await?;

            for member in &roster {
                let license = member.license(&category);
                info!(
                    cust_id = member.cust_id,
                    name = %member.display_name,
                    irating = license.map(|l| l.irating),
                    safety_rating = license.map(|l| l.safety_rating),
                    "Member"
                );
            }

            let licensed = roster
                .iter()
                .filter(|m| m.license(&category).is_some())
                .count();
            info!(total = roster.len(), licensed, category = %category, "Roster summary");
        }
    }

    Ok(())
}

fn build_reporter(concurrency: usize) -> Result<Reporter> {
    let api = IracingClient::new(Credentials::from_env()?)?;
    Ok(Reporter {
        api: Arc::new(api),
        charts: Arc::new(QuickChartClient::new()),
        sink: Arc::new(DiscordWebhook::new()),
        concurrency,
    })
}
