//! Batch-run configuration: the team list and schedule gating.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::Deserialize;

/// One configured team. `webhook_env` names the environment variable holding
/// the team's webhook URL, so the URLs themselves stay out of the file.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    pub team_id: u64,
    pub team_name: String,
    /// What a member is called in chart titles ("driver", "member", ...).
    #[serde(default = "default_member_name")]
    pub member_name: String,
    pub webhook_env: String,
    /// Secondary teams only receive the activity chart.
    #[serde(default)]
    pub activity_only: bool,
}

fn default_member_name() -> String {
    "driver".to_string()
}

impl TeamConfig {
    pub fn webhook_url(&self) -> Option<String> {
        std::env::var(&self.webhook_env).ok().filter(|v| !v.is_empty())
    }
}

/// Loads the team list from a JSON file.
pub fn load_teams(path: &Path) -> Result<Vec<TeamConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading team config {}", path.display()))?;
    let teams: Vec<TeamConfig> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing team config {}", path.display()))?;
    Ok(teams)
}

/// The weekly report is a Monday job; `always_run` (the `ALWAYS_RUN` env
/// override) forces it through for manual runs.
pub fn report_due(now: DateTime<Utc>, always_run: bool) -> bool {
    always_run || now.weekday() == Weekday::Mon
}

/// License category id for the `/data/member/chart_data` endpoint.
pub fn category_id(category: &str) -> Option<u32> {
    match category {
        "oval" => Some(1),
        "road" => Some(2),
        "dirt_oval" => Some(3),
        "dirt_road" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_load_teams() {
        let path = format!("{}/team_stats_test_teams.json", env::temp_dir().display());
        fs::write(
            &path,
            r#"[
                {"team_id": 1234, "team_name": "SloWmo", "member_name": "driver", "webhook_env": "SLOWMO_WEBHOOK"},
                {"team_id": 5678, "team_name": "Friends", "webhook_env": "FRIENDS_WEBHOOK", "activity_only": true}
            ]"#,
        )
        .unwrap();

        let teams = load_teams(Path::new(&path)).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team_id, 1234);
        assert_eq!(teams[0].member_name, "driver");
        assert!(!teams[0].activity_only);
        assert_eq!(teams[1].member_name, "driver"); // default
        assert!(teams[1].activity_only);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_teams_missing_file() {
        assert!(load_teams(Path::new("/nonexistent/teams.json")).is_err());
    }

    #[test]
    fn test_report_due_on_mondays() {
        let monday: DateTime<Utc> = "2024-01-01T08:00:00Z".parse().unwrap();
        let tuesday: DateTime<Utc> = "2024-01-02T08:00:00Z".parse().unwrap();

        assert!(report_due(monday, false));
        assert!(!report_due(tuesday, false));
        assert!(report_due(tuesday, true));
    }

    #[test]
    fn test_category_ids() {
        assert_eq!(category_id("road"), Some(2));
        assert_eq!(category_id("oval"), Some(1));
        assert_eq!(category_id("karting"), None);
    }
}
